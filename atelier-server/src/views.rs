//! Server-rendered HTML for the parameter form and the results view.

use std::fmt::Write;

use atelier_core::{
    GenerationForm, GenerationOutcome, StylePreset, GUIDANCE_RANGE, NUM_IMAGES_RANGE, STEPS_RANGE,
};

const STYLE: &str = "body{font-family:sans-serif;max-width:960px;margin:2rem auto;padding:0 1rem}\
label{display:block;margin:.75rem 0}textarea,input[type=text]{width:100%}\
.error{background:#fdd;border:1px solid #c33;padding:.75rem}\
.success{background:#dfd;border:1px solid #3a3;padding:.75rem}\
.results{display:flex;flex-wrap:wrap;gap:1rem}figure{margin:0}figure img{max-width:440px}";

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// The parameter form, pre-filled with `form`, with an optional error banner.
pub fn form_page(form: &GenerationForm, error: Option<&str>) -> String {
    page(form, error, "")
}

/// The form followed by the generated images and their download links.
pub fn results_page(form: &GenerationForm, outcome: &GenerationOutcome, output_dir: &str) -> String {
    let mut results = String::new();
    let _ = write!(
        results,
        "<p class=\"success\">Saved {} image(s) to {}</p><p>Prompt: <em>{}</em></p><div class=\"results\">",
        outcome.artifacts.len(),
        escape_html(output_dir),
        escape_html(&outcome.prompt),
    );
    for (index, generated) in outcome.artifacts.iter().enumerate() {
        let png = escape_html(&generated.artifact.png_file_name());
        let jpeg = escape_html(&generated.artifact.jpeg_file_name());
        let _ = write!(
            results,
            "<figure><img src=\"/artifacts/{png}\" alt=\"Generated image {n}\">\
             <figcaption>Generated Output {n}<br>\
             <a href=\"/artifacts/{png}?download=true\" download>Download PNG</a> | \
             <a href=\"/artifacts/{jpeg}?download=true\" download>Download JPEG</a>\
             </figcaption></figure>",
            n = index + 1,
        );
    }
    results.push_str("</div>");
    page(form, None, &results)
}

fn page(form: &GenerationForm, error: Option<&str>, results: &str) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!doctype html><html lang=\"en\"><head><meta charset=\"utf-8\">\
         <title>AI-Powered Image Generator</title><style>{STYLE}</style></head><body>\
         <h1>AI-Powered Image Generator</h1>"
    );
    if let Some(error) = error {
        let _ = write!(
            html,
            "<p class=\"error\">An error occurred: {}</p>",
            escape_html(error)
        );
    }
    html.push_str(&form_html(form));
    html.push_str(results);
    html.push_str("</body></html>");
    html
}

fn form_html(form: &GenerationForm) -> String {
    let style_options: String = StylePreset::ALL
        .iter()
        .map(|style| {
            let selected = if *style == form.style { " selected" } else { "" };
            format!(
                "<option value=\"{label}\"{selected}>{label}</option>",
                label = escape_html(style.label())
            )
        })
        .collect();
    let count_options: String = NUM_IMAGES_RANGE
        .map(|count| {
            let selected = if count == form.num_images { " selected" } else { "" };
            format!("<option value=\"{count}\"{selected}>{count}</option>")
        })
        .collect();

    format!(
        "<form method=\"post\" action=\"/generate\">\
         <label>Enter your prompt:<textarea name=\"prompt\" rows=\"3\">{prompt}</textarea></label>\
         <label>Negative Prompt (What to avoid):\
         <input type=\"text\" name=\"negative_prompt\" value=\"{negative}\"></label>\
         <fieldset><legend>Generation Settings</legend>\
         <label>Inference Steps (Quality): <output>{steps}</output>\
         <input type=\"range\" name=\"steps\" min=\"{steps_min}\" max=\"{steps_max}\" step=\"1\" value=\"{steps}\" \
         oninput=\"this.previousElementSibling.value=this.value\"></label>\
         <label>Guidance Scale (adherence to prompt): <output>{guidance}</output>\
         <input type=\"range\" name=\"guidance_scale\" min=\"{guidance_min:.1}\" max=\"{guidance_max:.1}\" step=\"0.5\" value=\"{guidance}\" \
         oninput=\"this.previousElementSibling.value=this.value\"></label>\
         <label>Style Preset<select name=\"style\">{style_options}</select></label>\
         <label>Number of Images<select name=\"num_images\">{count_options}</select></label>\
         </fieldset><button type=\"submit\">Generate Image</button></form>",
        prompt = escape_html(&form.prompt),
        negative = escape_html(&form.negative_prompt),
        steps = form.steps,
        steps_min = STEPS_RANGE.start(),
        steps_max = STEPS_RANGE.end(),
        guidance = form.guidance_scale,
        guidance_min = GUIDANCE_RANGE.start(),
        guidance_max = GUIDANCE_RANGE.end(),
    )
}
