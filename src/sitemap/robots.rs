// src/sitemap/robots.rs
// =============================================================================
// Reads the `Sitemap:` directives out of a robots.txt body.
//
// Only sitemap discovery is needed here; allow/disallow rules are not
// interpreted. Directive names are matched case-insensitively and the
// directives are global (they apply regardless of user-agent groups).
// =============================================================================

// Returns every sitemap URL declared in a robots.txt body, in file order
//
// Example:
//   "User-agent: *\nSitemap: https://example.com/sitemap.xml"
//   -> ["https://example.com/sitemap.xml"]
pub fn sitemap_directives(robots_txt: &str) -> Vec<String> {
    let mut sitemaps = Vec::new();

    for line in robots_txt.lines() {
        let line = line.trim();

        // Skip comments and empty lines
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // split_once on the first ':' keeps the "https:" of the value intact
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };

        if key.trim().eq_ignore_ascii_case("sitemap") {
            // Inline comments are only stripped when separated by whitespace,
            // a bare '#' can be a URL fragment
            let value = value.split(" #").next().unwrap_or("").trim();
            if !value.is_empty() {
                sitemaps.push(value.to_string());
            }
        }
    }

    sitemaps
}
