// src/utils/html.rs

/// Fills a certificate template body and sanitizes the result.
///
/// Template bodies come from the remote catalog and may carry markup such as
/// `<strong>`. Safe tags survive; scripts, iframes and event handlers are
/// stripped by ammonia's whitelist.
pub fn render_certificate_body(body: &str, final_score: f64) -> String {
    let filled = body.replace("{finalScore}", &final_score.to_string());
    ammonia::clean(&filled)
}
