use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("valid url regex"));
// Only mentions that start a token, so `https://site/@shop/item` survives
static MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)(^|\s)@\w+").expect("valid mention regex"));

pub const DEFAULT_CHANNEL: &str = "@DealLoot_India";
const PREVIEW_PLACEHOLDER: &str = "Product";
const CALL_TO_ACTION: &str = "👉 Grab Here:";

/// Shopping platform a deal post refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Amazon,
    Flipkart,
    Meesho,
    Ajio,
    Myntra,
    Generic,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Amazon => write!(f, "Amazon"),
            Platform::Flipkart => write!(f, "Flipkart"),
            Platform::Meesho => write!(f, "Meesho"),
            Platform::Ajio => write!(f, "Ajio"),
            Platform::Myntra => write!(f, "Myntra"),
            Platform::Generic => write!(f, "Generic"),
        }
    }
}

/// Classification entry mapping keyword/URL signals to a promotional template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformRule {
    pub platform: Platform,
    /// Matched against the lowercased message body
    pub keywords: &'static [&'static str],
    /// Matched as substrings of the extracted URLs
    pub url_hints: &'static [&'static str],
    pub header: &'static str,
    pub price_line: &'static str,
    /// Empty means the line is left out
    pub tagline: &'static str,
    pub hashtags: &'static str,
}

impl PlatformRule {
    pub fn matches_text(&self, lower: &str) -> bool {
        self.keywords.iter().any(|keyword| lower.contains(keyword))
    }

    pub fn matches_urls(&self, urls: &[String]) -> bool {
        self.url_hints
            .iter()
            .any(|hint| urls.iter().any(|url| url.contains(hint)))
    }
}

/// Ordered rule table plus the generic fallback. First match wins.
#[derive(Debug, Clone)]
pub struct RuleBook {
    rules: Vec<PlatformRule>,
    fallback: PlatformRule,
}

impl RuleBook {
    pub fn new(rules: Vec<PlatformRule>, fallback: PlatformRule) -> Self {
        Self { rules, fallback }
    }

    pub fn rules(&self) -> &[PlatformRule] {
        &self.rules
    }

    /// Body keywords are checked across every rule before any URL hint, so a
    /// keyword in the text always beats a URL-only signal.
    pub fn classify(&self, lower: &str, urls: &[String]) -> &PlatformRule {
        self.rules
            .iter()
            .find(|rule| rule.matches_text(lower))
            .or_else(|| self.rules.iter().find(|rule| rule.matches_urls(urls)))
            .unwrap_or(&self.fallback)
    }
}

impl Default for RuleBook {
    fn default() -> Self {
        Self::new(
            vec![
                PlatformRule {
                    platform: Platform::Amazon,
                    keywords: &["amazon"],
                    url_hints: &[],
                    header: "🔥 Amazon Loot Deal! 🔥",
                    price_line: "💰 Price: Just ___",
                    tagline: "⚡ Hurry, Limited Time Offer!",
                    hashtags: "#Amazon #LootDeal #DealLootIndia",
                },
                PlatformRule {
                    platform: Platform::Flipkart,
                    keywords: &["flipkart"],
                    url_hints: &["fkrt"],
                    header: "💥 Flipkart Mega Offer! 💥",
                    price_line: "💰 Price Drop Alert! Hurry 🚀",
                    tagline: "",
                    hashtags: "#Flipkart #Discount #DealLootIndia",
                },
                PlatformRule {
                    platform: Platform::Meesho,
                    keywords: &["meesho"],
                    url_hints: &[],
                    header: "🌸 Meesho Special Loot 🌸",
                    price_line: "💰 Lowest Price Ever!",
                    tagline: "",
                    hashtags: "#Meesho #FashionLoot #DealLootIndia",
                },
                PlatformRule {
                    platform: Platform::Ajio,
                    keywords: &["ajio"],
                    url_hints: &[],
                    header: "✨ Ajio Super Sale ✨",
                    price_line: "💰 Don’t Miss The Offer!",
                    tagline: "🛒 Stylish Picks for You",
                    hashtags: "#Ajio #StyleDeal #DealLootIndia",
                },
                PlatformRule {
                    platform: Platform::Myntra,
                    keywords: &["myntra"],
                    url_hints: &[],
                    header: "👗 Myntra Fashion Loot 👗",
                    price_line: "💰 Limited Time Only!",
                    tagline: "🛍️ Trendy Styles at Best Price",
                    hashtags: "#Myntra #FashionDeal #DealLootIndia",
                },
            ],
            PlatformRule {
                platform: Platform::Generic,
                keywords: &[],
                url_hints: &[],
                header: "🔥 Loot Deal! 🔥",
                price_line: "💰 Best Price",
                tagline: "⚡ Limited Time Offer",
                hashtags: "#DealLootIndia #LootDeal",
            },
        )
    }
}

/// Every `http(s)://` token in `text`, in the order they appear
pub fn extract_urls(text: &str) -> Vec<String> {
    URL_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Drops `@handle` mentions so reposted deals don't advertise other channels
pub fn strip_mentions(text: &str) -> String {
    MENTION_RE.replace_all(text, "${1}").trim().to_string()
}

/// Turns a raw deal post into the branded promotional template
#[derive(Debug, Clone)]
pub struct TemplateFormatter {
    rules: RuleBook,
    channel: String,
}

impl TemplateFormatter {
    pub fn new(rules: RuleBook, channel: impl Into<String>) -> Self {
        Self {
            rules,
            channel: channel.into(),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn classify(&self, raw_text: &str, urls: &[String]) -> Platform {
        self.rules
            .classify(&raw_text.to_lowercase(), urls)
            .platform
    }

    /// Formats a deal post. Blank input still yields a template with a
    /// placeholder title; callers are expected to reject it beforehand.
    pub fn format(&self, raw_text: &str, urls: &[String]) -> String {
        let lower = raw_text.to_lowercase();
        let rule = self.rules.classify(&lower, urls);

        let sanitized = strip_mentions(raw_text);
        let lines: Vec<&str> = sanitized
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let preview = lines.first().copied().unwrap_or(PREVIEW_PLACEHOLDER);

        let mut links: Vec<&str> = lines
            .iter()
            .copied()
            .filter(|line| line.contains("http"))
            .collect();
        if links.is_empty() {
            links = urls.iter().map(String::as_str).collect();
        }

        let product_line = format!("🛒 Product: {preview}");
        let follow_line = format!("👉 Follow {} for 🔥 daily loot deals!", self.channel);

        let mut out: Vec<&str> = vec![rule.header, product_line.as_str(), rule.price_line];
        if !rule.tagline.is_empty() {
            out.push(rule.tagline);
        }
        out.push("");
        out.push(CALL_TO_ACTION);
        out.extend(links);
        out.extend(["", follow_line.as_str(), "", rule.hashtags]);
        out.join("\n")
    }
}

impl Default for TemplateFormatter {
    fn default() -> Self {
        Self::new(RuleBook::default(), DEFAULT_CHANNEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_amazon_any_case() {
        let formatter = TemplateFormatter::default();
        for text in ["amazon deal", "AMAZON deal", "Big AmAzOn sale today"] {
            let out = formatter.format(text, &[]);
            assert!(out.starts_with("🔥 Amazon Loot Deal! 🔥"), "{out}");
            assert!(out.ends_with("#Amazon #LootDeal #DealLootIndia"));
        }
    }

    #[test]
    fn test_generic_fallback() {
        let formatter = TemplateFormatter::default();
        let out = formatter.format(
            "Cheap headphones\nhttps://example.com/a",
            &urls(&["https://example.com/a"]),
        );
        assert!(out.starts_with("🔥 Loot Deal! 🔥"));
        assert!(out.contains("⚡ Limited Time Offer"));
        assert!(out.ends_with("#DealLootIndia #LootDeal"));
    }

    #[test]
    fn test_preview_from_first_line() {
        let formatter = TemplateFormatter::default();
        let text = "iPhone 15 deal\nhttps://amzn.to/x";
        let out = formatter.format(text, &extract_urls(text));
        assert!(out.contains("🛒 Product: iPhone 15 deal"));
        assert!(out.contains("\nhttps://amzn.to/x\n"));
    }

    #[test]
    fn test_preview_skips_blank_lines() {
        let formatter = TemplateFormatter::default();
        let out = formatter.format("\n\n   \n  Air fryer  \nmore", &[]);
        assert!(out.contains("🛒 Product: Air fryer\n"));
    }

    #[test]
    fn test_preview_placeholder_for_blank_input() {
        let formatter = TemplateFormatter::default();
        let out = formatter.format("   \n ", &[]);
        assert!(out.contains("🛒 Product: Product"));
    }

    #[test]
    fn test_format_is_deterministic() {
        let formatter = TemplateFormatter::default();
        let text = "Myntra sneakers\nhttps://myntr.it/abc";
        let links = extract_urls(text);
        assert_eq!(formatter.format(text, &links), formatter.format(text, &links));
    }

    #[test]
    fn test_flipkart_by_url_only() {
        let formatter = TemplateFormatter::default();
        let out = formatter.format("Check this out", &urls(&["https://fkrt.it/xyz"]));
        assert!(out.starts_with("💥 Flipkart Mega Offer! 💥"));
        assert_eq!(
            formatter.classify("Check this out", &urls(&["https://fkrt.it/xyz"])),
            Platform::Flipkart
        );
    }

    #[test]
    fn test_keyword_beats_url_hint() {
        let formatter = TemplateFormatter::default();
        let links = urls(&["https://fkrt.it/xyz"]);
        assert_eq!(formatter.classify("Meesho kurti", &links), Platform::Meesho);
        assert_eq!(formatter.classify("amazon and flipkart", &links), Platform::Amazon);
    }

    #[test]
    fn test_rule_order() {
        let formatter = TemplateFormatter::default();
        assert_eq!(formatter.classify("ajio or myntra", &[]), Platform::Ajio);
        assert_eq!(formatter.classify("myntra", &[]), Platform::Myntra);
        assert_eq!(formatter.classify("flipkart meesho", &[]), Platform::Flipkart);
    }

    #[test]
    fn test_tagline_omitted_without_blank_line() {
        let formatter = TemplateFormatter::default();
        let out = formatter.format(
            "Flipkart TV\nhttps://fkrt.it/tv",
            &urls(&["https://fkrt.it/tv"]),
        );
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "💥 Flipkart Mega Offer! 💥",
                "🛒 Product: Flipkart TV",
                "💰 Price Drop Alert! Hurry 🚀",
                "",
                "👉 Grab Here:",
                "https://fkrt.it/tv",
                "",
                "👉 Follow @DealLoot_India for 🔥 daily loot deals!",
                "",
                "#Flipkart #Discount #DealLootIndia",
            ]
        );

        let meesho = formatter.format("meesho saree", &[]);
        let lines: Vec<&str> = meesho.lines().collect();
        assert_eq!(lines.len(), 9);
        assert_eq!(lines[2], "💰 Lowest Price Ever!");
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "👉 Grab Here:");
    }

    #[test]
    fn test_tagline_present() {
        let formatter = TemplateFormatter::default();
        let out = formatter.format("Amazon Echo\nhttps://amzn.to/echo", &[]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 11);
        assert_eq!(lines[3], "⚡ Hurry, Limited Time Offer!");
        assert_eq!(lines[4], "");
    }

    #[test]
    fn test_links_keep_order_and_whole_line() {
        let formatter = TemplateFormatter::default();
        let text = "Combo\nShoes: https://a.example/1\nplain line\n  https://b.example/2  ";
        let out = formatter.format(text, &extract_urls(text));
        assert!(
            out.contains("👉 Grab Here:\nShoes: https://a.example/1\nhttps://b.example/2\n\n")
        );
        assert!(!out.contains("plain line"));
    }

    #[test]
    fn test_link_fallback_to_urls() {
        let formatter = TemplateFormatter::default();
        let out = formatter.format(
            "Deal of the day",
            &urls(&["https://x.example/1", "https://x.example/2"]),
        );
        assert!(out.contains("👉 Grab Here:\nhttps://x.example/1\nhttps://x.example/2\n"));
    }

    #[test]
    fn test_mentions_stripped_from_preview() {
        let formatter = TemplateFormatter::default();
        let out = formatter.format("@OtherDeals Boat earbuds @spam\nhttps://amzn.to/b", &[]);
        assert!(out.contains("🛒 Product: Boat earbuds\n"));
        assert!(!out.contains("@OtherDeals"));
        assert!(!out.contains("@spam"));
    }

    #[test]
    fn test_custom_channel() {
        let formatter = TemplateFormatter::new(RuleBook::default(), "@MyDeals");
        let out = formatter.format("anything", &[]);
        assert!(out.contains("👉 Follow @MyDeals for 🔥 daily loot deals!"));
        assert_eq!(formatter.channel(), "@MyDeals");
    }

    #[test]
    fn test_ends_with_hashtags() {
        let formatter = TemplateFormatter::default();
        let out = formatter.format("ajio jacket", &[]);
        assert!(out.ends_with("#Ajio #StyleDeal #DealLootIndia"));
        assert!(!out.ends_with('\n'));
    }

    #[test]
    fn test_extract_urls() {
        let text = "see https://amzn.to/abc and http://fkrt.it/x?y=1\nnot www.example.com";
        assert_eq!(
            extract_urls(text),
            urls(&["https://amzn.to/abc", "http://fkrt.it/x?y=1"])
        );
        assert!(extract_urls("no links here").is_empty());
    }

    #[test]
    fn test_mentions_inside_links_survive() {
        let formatter = TemplateFormatter::default();
        let text = "Boat store @spam\nhttps://example.com/@boatstore/item";
        let out = formatter.format(text, &extract_urls(text));
        assert!(out.contains("🛒 Product: Boat store\n"));
        assert!(out.contains("\nhttps://example.com/@boatstore/item\n"));
        assert!(!out.contains("@spam"));
        assert_eq!(strip_mentions("mail me@home or @shop"), "mail me@home or");
    }

    #[test]
    fn test_strip_mentions() {
        assert_eq!(strip_mentions("@a hello @b_c world"), "hello  world");
        assert_eq!(strip_mentions("no mentions"), "no mentions");
    }

    #[test]
    fn test_default_rule_table_order() {
        let book = RuleBook::default();
        let order: Vec<Platform> = book.rules().iter().map(|r| r.platform).collect();
        assert_eq!(
            order,
            vec![
                Platform::Amazon,
                Platform::Flipkart,
                Platform::Meesho,
                Platform::Ajio,
                Platform::Myntra
            ]
        );
    }
}
