//! HTML → 纯文本
//!
//! 去掉 script / style / 注释，块级标签换行，其余标签删除，解码常见实体。

use once_cell::sync::Lazy;
use regex::Regex;

static HIDDEN_BLOCKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<noscript\b.*?</noscript\s*>|<!--.*?-->")
        .expect("隐藏块正则无效")
});

static BLOCK_BREAKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(?:p|div|li|tr|h[1-6]|section|article|blockquote|pre)\s*>")
        .expect("块级标签正则无效")
});

static TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("标签正则无效"));

static NUMERIC_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("数字实体正则无效"));

/// 把 HTML 页面转换为按行分隔的纯文本
pub fn html_to_text(html: &str) -> String {
    let visible = HIDDEN_BLOCKS.replace_all(html, " ");
    let with_breaks = BLOCK_BREAKS.replace_all(&visible, "\n");
    let stripped = TAGS.replace_all(&with_breaks, " ");
    let decoded = decode_entities(&stripped);

    decoded
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_entities(text: &str) -> String {
    let named = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'");

    let numeric = NUMERIC_ENTITY.replace_all(&named, |caps: &regex::Captures| {
        let raw = &caps[1];
        let code = match raw.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => raw.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
            .map(|c| c.to_string())
            .unwrap_or_else(|| caps[0].to_string())
    });

    // &amp; 最后处理，避免 "&amp;lt;" 被解码两次
    numeric.replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripts_and_styles_removed() {
        let html = r#"<html><head><style>p { color: red; }</style>
            <script type="text/javascript">var answer = "B";</script></head>
            <body><p>Answer: A</p></body></html>"#;

        assert_eq!(html_to_text(html), "Answer: A");
    }

    #[test]
    fn test_block_tags_become_lines() {
        let html = "<div>What is the capital of France?</div><ul><li>A. Paris</li><li>B. London</li></ul>";

        assert_eq!(
            html_to_text(html),
            "What is the capital of France?\nA. Paris\nB. London"
        );
    }

    #[test]
    fn test_entities_decoded() {
        assert_eq!(
            html_to_text("<p>Tom &amp; Jerry&nbsp;&#39;s &lt;b&gt; &#x41;</p>"),
            "Tom & Jerry 's <b> A"
        );
        assert_eq!(html_to_text("&amp;lt;"), "&lt;");
    }
}
