use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::ValidationError;

/// 文章分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    #[default]
    Finance,
    Career,
    Regulations,
}

/// 分类的展示样式
#[derive(Debug, PartialEq, Eq)]
pub struct CategoryStyle {
    /// 用于表单下拉选项的名称
    pub label: &'static str,
    pub icon: &'static str,
    /// 详情页底部的标签
    pub hashtag: &'static str,
}

const FINANCE: CategoryStyle = CategoryStyle {
    label: "Finance",
    icon: "💰",
    hashtag: "#finance",
};

const CAREER: CategoryStyle = CategoryStyle {
    label: "Career",
    icon: "💼",
    hashtag: "#career",
};

const REGULATIONS: CategoryStyle = CategoryStyle {
    label: "Regulations",
    icon: "⚖️",
    hashtag: "#regulations",
};

impl Category {
    pub const ALL: [Category; 3] = [Category::Finance, Category::Career, Category::Regulations];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Finance => "FINANCE",
            Category::Career => "CAREER",
            Category::Regulations => "REGULATIONS",
        }
    }

    /// 查询分类对应的展示样式
    pub fn style(self) -> &'static CategoryStyle {
        match self {
            Category::Finance => &FINANCE,
            Category::Career => &CAREER,
            Category::Regulations => &REGULATIONS,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    /// 忽略大小写，同时接受分类名和展示名
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s) || c.style().label.eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::UnknownCategory(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_category_ignores_case() {
        assert_eq!("finance".parse::<Category>().unwrap(), Category::Finance);
        assert_eq!(" CAREER ".parse::<Category>().unwrap(), Category::Career);
        assert_eq!("Regulations".parse::<Category>().unwrap(), Category::Regulations);
        assert!("sports".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_serde_uses_upper_case() {
        let json = serde_json::to_string(&Category::Regulations).unwrap();
        assert_eq!(json, "\"REGULATIONS\"");

        let parsed: Category = serde_json::from_str("\"CAREER\"").unwrap();
        assert_eq!(parsed, Category::Career);
    }

    #[test]
    fn test_every_category_has_distinct_style() {
        let tags: Vec<_> = Category::ALL.iter().map(|c| c.style().hashtag).collect();
        assert_eq!(tags, vec!["#finance", "#career", "#regulations"]);
    }
}
