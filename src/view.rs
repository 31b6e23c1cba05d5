use crate::content::ArticleId;

/// 当前显示的视图
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveView {
    Listing,
    Detail,
}

/// 两个视图之间的导航状态
///
/// 选中的文章只存在于详情视图中，因此“列表视图且有选中文章”的状态无法表示。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewState {
    #[default]
    Listing,
    Detail(ArticleId),
}

impl ViewState {
    /// 切换到某篇文章的详情
    ///
    /// 调用方应同时把滚动位置重置到顶部。
    pub fn show_detail(&mut self, id: ArticleId) {
        tracing::debug!(id, "show detail");
        *self = ViewState::Detail(id);
    }

    /// 回到列表，清除选中的文章
    pub fn show_listing(&mut self) {
        tracing::debug!("show listing");
        *self = ViewState::Listing;
    }

    pub fn active_view(&self) -> ActiveView {
        match self {
            ViewState::Listing => ActiveView::Listing,
            ViewState::Detail(_) => ActiveView::Detail,
        }
    }

    pub fn selected_article(&self) -> Option<ArticleId> {
        match self {
            ViewState::Listing => None,
            ViewState::Detail(id) => Some(*id),
        }
    }
}
