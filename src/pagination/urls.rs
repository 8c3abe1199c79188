/// Appends `page=N` with `&` or `?` depending on existing query parameters
pub fn with_page_param(base_url: &str, page: usize) -> String {
    let separator = determine_separator(base_url);
    format!("{}{}page={}", base_url, separator, page)
}

fn determine_separator(url: &str) -> char {
    if url.contains('?') { '&' } else { '?' }
}
