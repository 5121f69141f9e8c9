//! 反向引用页（“References to /user/post”）的视图模型。
//!
//! 数据来自外部状态：帖子条目、当前用户、路由加载标志与路由参数。
//! 这里只决定标题链接和正文分支，不做分页。

use serde::{Deserialize, Serialize};

const EMPTY_MESSAGE: &str = "No references found.";

/// 路由参数。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteParams {
    pub user_name: String,
    pub post_id: String,
}

impl RouteParams {
    /// 被引用帖子的展示链接 `/{userName}/{postId}`。
    pub fn post_link(&self) -> String {
        format!("/{}/{}", self.user_name, self.post_id)
    }
}

/// 正文分支。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "entries", rename_all = "camelCase")]
pub enum BacklinksBody<E> {
    /// 路由仍在加载，不渲染正文。
    Loading,
    /// 没有引用。
    Empty,
    /// 交给分页信息流渲染的条目。
    Feed(Vec<E>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BacklinksView<E, U> {
    pub post_link: String,
    pub user: U,
    pub body: BacklinksBody<E>,
}

impl<E, U> BacklinksView<E, U> {
    pub fn new(entries: Vec<E>, user: U, route_loading: bool, params: &RouteParams) -> Self {
        let body = if route_loading {
            BacklinksBody::Loading
        } else if entries.is_empty() {
            BacklinksBody::Empty
        } else {
            BacklinksBody::Feed(entries)
        };

        Self {
            post_link: params.post_link(),
            user,
            body,
        }
    }

    pub fn header(&self) -> String {
        format!("References to {}", self.post_link)
    }

    /// 空态文案；其他分支为 `None`。
    pub fn empty_message(&self) -> Option<&'static str> {
        match self.body {
            BacklinksBody::Empty => Some(EMPTY_MESSAGE),
            _ => None,
        }
    }
}
