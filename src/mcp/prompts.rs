//! Prompt records, template rendering, and the prompt registry.
//!
//! A prompt is a parametrized text template the host retrieves to prime an
//! LLM conversation. Placeholders use the `{{name}}` form and are substituted
//! with the argument values supplied in `prompts/get`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::{PixelsmithError, Result};

/// Specification of one prompt argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

/// A named, parametrized text template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    /// Unique prompt name.
    pub name: String,
    /// Short display title.
    pub title: String,
    /// Human-readable description.
    pub description: String,
    /// Accepted arguments, in declaration order.
    #[serde(default)]
    pub arguments: Vec<PromptArgument>,
    /// Template text with `{{name}}` placeholders.
    pub template: String,
}

impl Prompt {
    /// Substitutes the supplied values into the template.
    ///
    /// A required argument that is absent is an error. Placeholders for
    /// absent optional arguments are left untouched.
    pub fn render(&self, arguments: &HashMap<String, String>) -> Result<String> {
        for arg in &self.arguments {
            if arg.required && !arguments.contains_key(&arg.name) {
                return Err(PixelsmithError::MissingArgument {
                    name: arg.name.clone(),
                });
            }
        }

        let mut text = self.template.clone();
        for (name, value) in arguments {
            text = text.replace(&format!("{{{{{}}}}}", name), value);
        }
        Ok(text)
    }
}

/// Named lookup table of prompts.
///
/// Populated once before the transport loop starts; read-only afterwards.
#[derive(Debug, Default)]
pub struct PromptRegistry {
    prompts: Vec<Prompt>,
}

impl PromptRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a prompt. Fails if a prompt with the same name already exists.
    pub fn register(&mut self, prompt: Prompt) -> Result<()> {
        if self.get(&prompt.name).is_some() {
            return Err(PixelsmithError::Registry {
                message: format!("prompt already registered: {}", prompt.name),
            });
        }
        self.prompts.push(prompt);
        Ok(())
    }

    /// Looks up a prompt by name.
    pub fn get(&self, name: &str) -> Option<&Prompt> {
        self.prompts.iter().find(|p| p.name == name)
    }

    /// Returns every registered prompt, in registration order.
    pub fn all(&self) -> &[Prompt] {
        &self.prompts
    }

    /// Number of registered prompts.
    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    /// True when nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate_prompt() -> Prompt {
        Prompt {
            name: "generate_image_prompt".to_string(),
            title: "Generate image".to_string(),
            description: "Prompt for generating an image of a subject".to_string(),
            arguments: vec![
                PromptArgument {
                    name: "subject".to_string(),
                    description: "What the image should depict".to_string(),
                    required: true,
                },
                PromptArgument {
                    name: "style".to_string(),
                    description: "Optional art style".to_string(),
                    required: false,
                },
            ],
            template: "Generate a {{subject}} in {{style}} style".to_string(),
        }
    }

    #[test]
    fn test_render_substitutes_placeholders() {
        let prompt = generate_prompt();
        let mut args = HashMap::new();
        args.insert("subject".to_string(), "cat".to_string());
        args.insert("style".to_string(), "watercolor".to_string());

        let text = prompt.render(&args).unwrap();
        assert_eq!(text, "Generate a cat in watercolor style");
    }

    #[test]
    fn test_render_missing_required_argument() {
        let prompt = generate_prompt();
        let err = prompt.render(&HashMap::new()).unwrap_err();
        assert!(matches!(
            err,
            PixelsmithError::MissingArgument { ref name } if name == "subject"
        ));
    }

    #[test]
    fn test_render_leaves_absent_optional_placeholder() {
        let prompt = generate_prompt();
        let mut args = HashMap::new();
        args.insert("subject".to_string(), "cat".to_string());

        let text = prompt.render(&args).unwrap();
        assert_eq!(text, "Generate a cat in {{style}} style");
    }

    #[test]
    fn test_render_repeated_placeholder() {
        let prompt = Prompt {
            name: "echo".to_string(),
            title: "Echo".to_string(),
            description: "Repeats the subject".to_string(),
            arguments: vec![PromptArgument {
                name: "subject".to_string(),
                description: String::new(),
                required: true,
            }],
            template: "{{subject}} and {{subject}}".to_string(),
        };
        let mut args = HashMap::new();
        args.insert("subject".to_string(), "cat".to_string());
        assert_eq!(prompt.render(&args).unwrap(), "cat and cat");
    }

    #[test]
    fn test_registry_rejects_duplicate() {
        let mut registry = PromptRegistry::new();
        registry.register(generate_prompt()).unwrap();
        assert!(registry.register(generate_prompt()).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_prompt_deserializes_from_config_shape() {
        let prompt: Prompt = serde_json::from_str(
            r#"{
                "name": "upscale_hint",
                "title": "Upscale hint",
                "description": "Hint for upscaling",
                "arguments": [{"name": "factor", "description": "Scale factor", "required": true}],
                "template": "Upscale by {{factor}}x"
            }"#,
        )
        .unwrap();
        assert_eq!(prompt.name, "upscale_hint");
        assert!(prompt.arguments[0].required);
    }
}
