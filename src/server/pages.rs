//! The generator form.

use super::routing::GENERATE_PATH;
use crate::core::fields::{names, DEFAULT_VERSION};
use crate::forge::validator::{ALLOWED_PHP_VERSIONS, FIELD_LIMITS, REQUIRED_FIELDS};

struct Input {
    name: &'static str,
    label: &'static str,
    kind: &'static str,
    pattern: Option<&'static str>,
    placeholder: &'static str,
}

const INPUTS: [Input; 9] = [
    Input { name: names::PLUGIN_NAME, label: "Plugin name", kind: "text", pattern: None, placeholder: "My Awesome Plugin" },
    Input { name: names::PLUGIN_SLUG, label: "Plugin slug", kind: "text", pattern: Some("[a-z0-9-]+"), placeholder: "my-awesome-plugin" },
    Input { name: names::TEXT_DOMAIN, label: "Text domain", kind: "text", pattern: Some("[a-z0-9-]+"), placeholder: "my-awesome-plugin" },
    Input { name: names::PLUGIN_NAMESPACE, label: "Plugin namespace", kind: "text", pattern: Some("[A-Za-z][A-Za-z0-9]*"), placeholder: "MyAwesomePlugin" },
    Input { name: names::VENDOR_NAMESPACE, label: "Vendor namespace", kind: "text", pattern: Some("[A-Za-z][A-Za-z0-9]*"), placeholder: "MyCompany" },
    Input { name: names::AUTHOR_NAME, label: "Author", kind: "text", pattern: None, placeholder: "Jane Doe" },
    Input { name: names::AUTHOR_URI, label: "Author URI", kind: "url", pattern: None, placeholder: "https://example.com" },
    Input { name: names::PLUGIN_URI, label: "Plugin URI", kind: "url", pattern: None, placeholder: "https://example.com/my-plugin" },
    Input { name: names::VERSION, label: "Version", kind: "text", pattern: Some("[0-9]+\\.[0-9]+\\.[0-9]+"), placeholder: DEFAULT_VERSION },
];

fn max_length(name: &str) -> usize {
    FIELD_LIMITS
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, max)| *max)
        .unwrap_or(100)
}

fn is_required(name: &str) -> bool {
    REQUIRED_FIELDS.iter().any(|(key, _)| *key == name)
}

/// Form page HTML with the hidden token input already rendered.
pub fn form_page(token_field: &str) -> String {
    let mut html = String::with_capacity(4096);
    html.push_str(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <title>WordPress Plugin Generator</title>\n</head>\n<body>\n\
         <h1>WordPress Plugin Generator</h1>\n",
    );
    html.push_str(&format!(
        "<form id=\"plugin-form\" action=\"{}\" method=\"POST\">\n{}\n",
        GENERATE_PATH, token_field
    ));

    for input in &INPUTS {
        let required = is_required(input.name);
        html.push_str(&format!(
            "<p><label for=\"{name}\">{label}{star}</label>\n\
             <input type=\"{kind}\" id=\"{name}\" name=\"{name}\" placeholder=\"{placeholder}\" maxlength=\"{max}\"{pattern}{required}></p>\n",
            name = input.name,
            label = input.label,
            star = if required { " *" } else { "" },
            kind = input.kind,
            placeholder = input.placeholder,
            max = max_length(input.name),
            pattern = input
                .pattern
                .map(|p| format!(" pattern=\"{}\"", p))
                .unwrap_or_default(),
            required = if required { " required" } else { "" },
        ));
    }

    html.push_str(&format!(
        "<p><label for=\"{name}\">Description</label>\n\
         <textarea id=\"{name}\" name=\"{name}\" rows=\"2\" maxlength=\"{max}\"></textarea></p>\n",
        name = names::PLUGIN_DESCRIPTION,
        max = max_length(names::PLUGIN_DESCRIPTION),
    ));

    html.push_str(&format!(
        "<p><label for=\"{name}\">Requires PHP</label>\n<select id=\"{name}\" name=\"{name}\">\n",
        name = names::REQUIRES_PHP
    ));
    for version in ALLOWED_PHP_VERSIONS {
        html.push_str(&format!("<option value=\"{0}\">{0}</option>\n", version));
    }
    html.push_str("</select></p>\n");

    html.push_str("<p><button type=\"submit\">Generate plugin</button></p>\n</form>\n</body>\n</html>\n");
    html
}
