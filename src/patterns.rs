//! Compiled regex patterns used across scraping, extraction and rendering.
//!
//! All patterns are compiled once using `LazyLock`.
//! Patterns are organized by the pipeline stage that uses them.

#![allow(clippy::expect_used)]

use std::sync::LazyLock;

use regex::Regex;

// =============================================================================
// Challenge Detection Patterns
// =============================================================================

/// Page titles of bot-challenge interstitials (Cloudflare, Akamai, in-house).
///
/// Anchored to the whole title: a signature may only be followed by
/// punctuation or a `| Vendor` style suffix, so conversation titles that
/// merely mention "access denied" do not match.
pub static CHALLENGE_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:just a moment|attention required|verify you are (?:a )?human|are you a robot|access denied|checking your browser|security check|one more step|please wait|ddos-guard)[\s.!?…]*(?:[|:–—-].*)?$",
    )
    .expect("CHALLENGE_TITLE regex")
});

/// Body text of bot-challenge interstitials. Only applied to short bodies.
pub static CHALLENGE_BODY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(verify you are (a )?human|checking (if the site connection is secure|your browser)|enable javascript and cookies to continue|press (&|and) hold|complete the security check|unusual traffic|needs to review the security of your connection|ray id)",
    )
    .expect("CHALLENGE_BODY regex")
});

/// Navigation error messages that indicate blocking rather than a broken URL.
pub static BLOCKING_NAVIGATION_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(time(d)?\s?out|deadline|access.denied|\b403\b|\b429\b|forbidden|captcha|challenge|err_http2_protocol_error|err_blocked|err_connection_reset)",
    )
    .expect("BLOCKING_NAVIGATION_ERROR regex")
});

// =============================================================================
// Role Inference Patterns
// =============================================================================

/// Class / test-id keywords naming the user side of a conversation.
pub static USER_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\buser\b|user[-_]|[-_]user|human|query|prompt|you[-_]said|request)")
        .expect("USER_KEYWORD regex")
});

/// Class / test-id keywords naming the assistant side of a conversation.
pub static ASSISTANT_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(assistant|\bbot\b|bot[-_]|\bmodel\b|model[-_]|response|answer|\bai\b|ai[-_]message|claude[-_]message|markdown)")
        .expect("ASSISTANT_KEYWORD regex")
});

/// Class / test-id keywords for system turns.
pub static SYSTEM_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bsystem\b|system[-_]message").expect("SYSTEM_KEYWORD regex"));

/// Class / test-id keywords for tool turns.
pub static TOOL_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\btool\b|tool[-_](call|result|output)|function[-_]call").expect("TOOL_KEYWORD regex")
});

/// Leading "You said:" label of user turns.
pub static USER_TEXT_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*you said\s*:").expect("USER_TEXT_PREFIX regex"));

/// Leading "<Product> said:" label of assistant turns.
pub static ASSISTANT_TEXT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(chatgpt|claude|gemini|grok|assistant|model)\s+said\s*:")
        .expect("ASSISTANT_TEXT_PREFIX regex")
});

// =============================================================================
// Code Language Patterns
// =============================================================================

/// `language-python` / `lang-rs` class tokens.
pub static LANGUAGE_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)(?:language|lang)-([A-Za-z0-9_+#.-]+)").expect("LANGUAGE_CLASS regex")
});

// =============================================================================
// Title Patterns
// =============================================================================

/// Provider branding around page titles ("ChatGPT - Foo", "Foo | Claude").
pub static TITLE_BRANDING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(^\s*(chatgpt|claude|gemini|grok)\s*[-|–—:]\s*|\s*[-|–—]\s*(chatgpt|claude|google gemini|gemini|grok)\s*$)")
        .expect("TITLE_BRANDING regex")
});

// =============================================================================
// Markdown / HTML Output Patterns
// =============================================================================

/// Runs of whitespace (collapsed to one space in prose and table cells).
pub static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("WHITESPACE_RUN regex"));

/// Characters removed when building heading slugs.
pub static SLUG_STRIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("SLUG_STRIP regex"));

/// Opening or closing `<script` / `<style` tags, any case.
pub static ACTIVE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(/?)(script|style)").expect("ACTIVE_TAG regex"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_challenge_title_patterns() {
        assert!(CHALLENGE_TITLE.is_match("Just a moment..."));
        assert!(CHALLENGE_TITLE.is_match("Attention Required! | Cloudflare"));
        assert!(CHALLENGE_TITLE.is_match("Access denied | chatgpt.com used Cloudflare to restrict access"));
        assert!(!CHALLENGE_TITLE.is_match("ChatGPT - Verify my SQL query"));
        assert!(!CHALLENGE_TITLE.is_match("Access denied errors in nginx"));
        assert!(!CHALLENGE_TITLE.is_match("Fixing a security check in CI"));
    }

    #[test]
    fn test_blocking_navigation_errors() {
        assert!(BLOCKING_NAVIGATION_ERROR.is_match("Request timed out"));
        assert!(BLOCKING_NAVIGATION_ERROR.is_match("net::ERR_HTTP2_PROTOCOL_ERROR"));
        assert!(BLOCKING_NAVIGATION_ERROR.is_match("HTTP 403 Forbidden"));
        assert!(!BLOCKING_NAVIGATION_ERROR.is_match("net::ERR_NAME_NOT_RESOLVED"));
    }

    #[test]
    fn test_language_class() {
        let caps = LANGUAGE_CLASS.captures("hljs language-python").map(|c| c[1].to_string());
        assert_eq!(caps.as_deref(), Some("python"));
        let caps = LANGUAGE_CLASS.captures("lang-c++").map(|c| c[1].to_string());
        assert_eq!(caps.as_deref(), Some("c++"));
        assert!(LANGUAGE_CLASS.captures("mylanguage-x").is_none());
    }

    #[test]
    fn test_title_branding() {
        assert_eq!(TITLE_BRANDING.replace_all("ChatGPT - Rust lifetimes", ""), "Rust lifetimes");
        assert_eq!(TITLE_BRANDING.replace_all("Rust lifetimes | Claude", ""), "Rust lifetimes");
    }

    #[test]
    fn test_text_prefixes() {
        assert!(USER_TEXT_PREFIX.is_match("You said: hi"));
        assert!(ASSISTANT_TEXT_PREFIX.is_match("ChatGPT said: hello"));
        assert!(!ASSISTANT_TEXT_PREFIX.is_match("The model said: x"));
    }
}
