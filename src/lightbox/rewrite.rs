//! 源地址改写：把外部网盘的“分享页”链接换成直链。
//!
//! 只做前缀替换，不解析 URL，查询串和片段原样保留。

/// 单条前缀改写规则。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteRule {
    pub from: &'static str,
    pub to: &'static str,
}

impl RewriteRule {
    pub fn apply(&self, src: &str) -> Option<String> {
        src.strip_prefix(self.from)
            .map(|rest| format!("{}{}", self.to, rest))
    }
}

/// Dropbox 分享页 → 直链内容地址。
pub const DROPBOX_DIRECT_LINK: RewriteRule = RewriteRule {
    from: "https://www.dropbox.com/s/",
    to: "https://dl.dropboxusercontent.com/s/",
};

const SOURCE_REWRITES: &[RewriteRule] = &[DROPBOX_DIRECT_LINK];

/// 命中规则则改写，否则原样返回。
pub fn rewrite_source(src: &str) -> String {
    SOURCE_REWRITES
        .iter()
        .find_map(|rule| rule.apply(src))
        .unwrap_or_else(|| src.to_string())
}
