//! Generic HTML views: not-found, confirmation and error pages.
//!
//! None of these pages carry page-specific content, so nothing about a
//! missing or failing page is revealed to the visitor.

use lander_core::sanitize::escape_text;

fn shell(title: &str, heading: &str, message: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n\
         <style>\nbody {{ font-family: system-ui, sans-serif; max-width: 36rem; margin: 4rem auto; padding: 0 1rem; color: #222; }}\n</style>\n\
         </head>\n<body>\n<main class=\"lander-notice\">\n<h1>{heading}</h1>\n<p>{message}</p>\n</main>\n</body>\n</html>\n",
        title = escape_text(title),
        heading = escape_text(heading),
        message = escape_text(message),
    )
}

/// Shown for unknown, malformed and unpublished slugs.
#[must_use]
pub fn not_found_page() -> String {
    shell(
        "Page not found",
        "Page not found",
        "The page you are looking for does not exist or is no longer available.",
    )
}

/// Shown after a form submission when no redirect applies.
#[must_use]
pub fn confirmation_page() -> String {
    shell(
        "Thank you",
        "Thank you!",
        "Your information has been received. We will be in touch soon.",
    )
}

/// Shown for bad requests and temporary failures.
#[must_use]
pub fn error_page(heading: &str, message: &str) -> String {
    shell(heading, heading, message)
}
