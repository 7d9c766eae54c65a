use minijinja::{Environment, context};
use minijinja_contrib::pycompat::unknown_method_callback;

use super::{error::Error, input::Message};

pub const DEFAULT_CHAT_TEMPLATE: &str = "\
{%- for message in messages -%}
<|im_start|>{{ message.role }}
{{ message.content }}<|im_end|>
{% endfor -%}
{%- if add_generation_prompt -%}
<|im_start|>assistant
{% endif -%}";

pub trait InputProcessor: Send + Sync {
    fn process(
        &self,
        messages: &[Message],
    ) -> Result<String, Error>;
}

pub struct InputProcessorDefault {
    chat_template: String,
}

impl InputProcessorDefault {
    pub fn new(chat_template: Option<String>) -> Self {
        Self {
            chat_template: chat_template
                .unwrap_or_else(|| DEFAULT_CHAT_TEMPLATE.to_string()),
        }
    }
}

impl InputProcessor for InputProcessorDefault {
    fn process(
        &self,
        messages: &[Message],
    ) -> Result<String, Error> {
        let template_name = "chat_template";
        let mut environment = Environment::new();
        environment.set_unknown_method_callback(unknown_method_callback);
        environment
            .add_template(template_name, self.chat_template.as_str())
            .map_err(|_| Error::UnableToLoadPromptTemplate)?;
        let template = environment
            .get_template(template_name)
            .map_err(|_| Error::UnableToLoadPromptTemplate)?;

        template
            .render(
                context!(messages => messages, add_generation_prompt => true),
            )
            .map_err(|_| Error::UnableToRenderPromptTemplate)
    }
}
