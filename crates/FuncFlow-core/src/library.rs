//! # Function Library
//!
//! Reusable function templates, grouped by category. Dropping a template on
//! the canvas creates a `FunctionNode` pre-filled with its inputs, output
//! name and code.

use crate::descriptor::check_unique;
use crate::error::{DescriptorError, TemplateError};
use crate::ids::NodeIdAllocator;
use crate::node::FunctionNode;
use serde::{Deserialize, Serialize};

pub const CUSTOM_CATEGORY: &str = "Custom Functions";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionTemplate {
    pub name: String,
    pub code: String,
    pub inputs: Vec<String>,
    pub output: String,
}

/// Non-fatal findings from template validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TemplateWarning {
    /// The code never uses `return`, so the node may always yield `null`.
    MissingReturn,
}

impl FunctionTemplate {
    pub fn new(
        name: impl Into<String>,
        code: impl Into<String>,
        inputs: &[&str],
        output: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            output: output.into(),
        }
    }

    /// Checks the template is usable as a node definition.
    pub fn validate(&self) -> Result<Vec<TemplateWarning>, TemplateError> {
        if self.name.trim().is_empty() {
            return Err(TemplateError::MissingName);
        }
        if self.output.trim().is_empty() {
            return Err(TemplateError::MissingOutput);
        }
        if self.inputs.is_empty() {
            return Err(TemplateError::NoInputs);
        }
        if let Err(DescriptorError::DuplicateInput(name)) = check_unique(&self.inputs) {
            return Err(TemplateError::DuplicateInput(name));
        }
        if self.code.trim().is_empty() {
            return Err(TemplateError::EmptyCode);
        }

        let mut warnings = Vec::new();
        if !self.code.contains("return") {
            warnings.push(TemplateWarning::MissingReturn);
        }
        Ok(warnings)
    }

    /// Creates a node carrying this template's function.
    pub fn instantiate(&self, ids: &NodeIdAllocator) -> Result<FunctionNode, TemplateError> {
        self.validate()?;
        let mut node = FunctionNode::new(ids);
        node.title = self.name.clone();
        node.set_inputs(self.inputs.clone())?;
        node.rename_output(self.output.trim())?;
        node.set_code_body(self.code.clone());
        Ok(node)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub functions: Vec<FunctionTemplate>,
}

/// The template tree shown in the editor's sidebar.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionLibrary {
    pub categories: Vec<Category>,
}

impl Default for FunctionLibrary {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl FunctionLibrary {
    pub fn empty() -> Self {
        Self {
            categories: Vec::new(),
        }
    }

    /// File and system helpers plus an empty custom category.
    pub fn with_builtins() -> Self {
        let mut library = Self::empty();
        library.push(
            "File Operations",
            FunctionTemplate::new(
                "Read File",
                "let content = read_file(filename);\nreturn content;",
                &["filename"],
                "content",
            ),
        );
        library.push(
            "File Operations",
            FunctionTemplate::new(
                "Write File",
                "write_file(filename, content);\nreturn true;",
                &["filename", "content"],
                "success",
            ),
        );
        library.push(
            "System Operations",
            FunctionTemplate::new(
                "Run Command",
                "let result = run_command(command);\nreturn result;",
                &["command"],
                "output",
            ),
        );
        library.category_mut(CUSTOM_CATEGORY);
        library
    }

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn find(&self, category: &str, name: &str) -> Option<&FunctionTemplate> {
        self.category(category)?
            .functions
            .iter()
            .find(|f| f.name == name)
    }

    /// Adds a validated template, creating the category when needed.
    pub fn add_custom_function(
        &mut self,
        category: &str,
        template: FunctionTemplate,
    ) -> Result<Vec<TemplateWarning>, TemplateError> {
        let warnings = template.validate()?;
        tracing::info!(category, function = %template.name, "Registered function template");
        self.push(category, template);
        Ok(warnings)
    }

    /// Replaces a template in the custom category.
    pub fn edit_custom_function(
        &mut self,
        name: &str,
        template: FunctionTemplate,
    ) -> Result<Vec<TemplateWarning>, TemplateError> {
        let warnings = template.validate()?;
        let slot = self
            .category_mut(CUSTOM_CATEGORY)
            .functions
            .iter_mut()
            .find(|f| f.name == name)
            .ok_or_else(|| TemplateError::UnknownTemplate {
                category: CUSTOM_CATEGORY.to_string(),
                name: name.to_string(),
            })?;
        *slot = template;
        Ok(warnings)
    }

    /// Deletes a template. Only custom templates can be removed.
    pub fn remove_function(
        &mut self,
        category: &str,
        name: &str,
    ) -> Result<FunctionTemplate, TemplateError> {
        if category != CUSTOM_CATEGORY {
            return Err(TemplateError::ReadOnlyCategory(category.to_string()));
        }
        let unknown = || TemplateError::UnknownTemplate {
            category: category.to_string(),
            name: name.to_string(),
        };
        let functions = &mut self
            .categories
            .iter_mut()
            .find(|c| c.name == category)
            .ok_or_else(unknown)?
            .functions;
        let idx = functions
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(unknown)?;
        Ok(functions.remove(idx))
    }

    /// Merges categories from a YAML document of the form
    ///
    /// ```yaml
    /// categories:
    ///   - name: Math
    ///     functions:
    ///       - { name: Add, code: "return a + b;", inputs: [a, b], output: sum }
    /// ```
    ///
    /// Every template is validated before anything is merged.
    pub fn load_yaml(&mut self, text: &str) -> Result<usize, TemplateError> {
        let doc: FunctionLibrary = serde_yaml::from_str(text)?;
        for category in &doc.categories {
            for template in &category.functions {
                template.validate()?;
            }
        }

        let mut count = 0;
        for category in doc.categories {
            self.category_mut(&category.name);
            for template in category.functions {
                self.push(&category.name, template);
                count += 1;
            }
        }
        tracing::info!(count, "Loaded function templates");
        Ok(count)
    }

    fn push(&mut self, category: &str, template: FunctionTemplate) {
        self.category_mut(category).functions.push(template);
    }

    fn category_mut(&mut self, name: &str) -> &mut Category {
        let idx = match self.categories.iter().position(|c| c.name == name) {
            Some(idx) => idx,
            None => {
                self.categories.push(Category {
                    name: name.to_string(),
                    functions: Vec::new(),
                });
                self.categories.len() - 1
            }
        };
        &mut self.categories[idx]
    }
}
