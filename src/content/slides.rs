/// Trailing slide number of a lesson title such as `Slide 12` or
/// `Incoterms Presentation - 3`.
pub fn slide_number(title: &str) -> Option<u32> {
    title.split_whitespace().last()?.parse().ok()
}

/// A full-width image block pointing at `{image_base}{number}.{extension}`.
pub fn slide_html(image_base: &str, number: u32, extension: &str, alt_label: &str) -> String {
    format!(
        concat!(
            r#"<div class="slide-content"><img src="{base}{n}.{ext}" alt="{alt} Slide {n}" "#,
            r#"style="width: 100%; max-width: 800px; height: auto; display: block; margin: 0 auto;" /></div>"#
        ),
        base = image_base,
        n = number,
        ext = extension.trim_start_matches('.'),
        alt = alt_label,
    )
}
