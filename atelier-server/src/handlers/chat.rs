//! Chat command routing
//!
//! Free-text operator commands are matched against an ordered list of
//! keyword rules. The first rule with a keyword contained in the text wins;
//! rule order is significant because intents overlap.

use atelier_protocol::ToolRequest;
use serde_json::json;

use crate::tools::GenerationKind;

/// One keyword rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRule {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    pub tool: &'static str,
    pub action: &'static str,
}

impl ChatRule {
    /// Case-insensitive substring match against any keyword
    pub fn matches(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.keywords
            .iter()
            .any(|keyword| text.contains(&keyword.to_lowercase()))
    }
}

/// Ordered rule list with a fallback reply
#[derive(Debug, Clone)]
pub struct ChatRules {
    rules: Vec<ChatRule>,
}

impl Default for ChatRules {
    fn default() -> Self {
        Self::standard()
    }
}

impl ChatRules {
    /// Animation first, then layout, then image optimization
    pub fn standard() -> Self {
        Self {
            rules: vec![
                ChatRule {
                    name: "animation",
                    keywords: &["애니메이션", "동영상", "영상", "모션", "animation", "video", "motion"],
                    tool: GenerationKind::Animation.tool(),
                    action: "launch",
                },
                ChatRule {
                    name: "layout",
                    keywords: &["레이아웃", "화면", "구조", "layout", "wireframe"],
                    tool: "figma",
                    action: "launch",
                },
                ChatRule {
                    name: "image",
                    keywords: &["이미지", "최적화", "사진", "보정", "image", "optimize", "photo"],
                    tool: "photoshop",
                    action: "launch",
                },
            ],
        }
    }

    /// First matching rule
    pub fn classify(&self, text: &str) -> Option<&ChatRule> {
        self.rules.iter().find(|rule| rule.matches(text))
    }

    /// Matching rule and the tool request synthesized for `text`
    ///
    /// `None` means the fallback reply applies.
    pub fn resolve(&self, text: &str) -> Option<(&ChatRule, ToolRequest)> {
        self.classify(text).map(|rule| {
            let request = ToolRequest::new(rule.tool, rule.action, json!({ "prompt": text }));
            (rule, request)
        })
    }

    /// Reply for text no rule matched
    pub fn fallback_message(text: &str) -> String {
        format!(
            "Received: '{}'. Try asking for an animation (애니메이션), a layout (레이아웃) \
             or image optimization (이미지 최적화).",
            text
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_animation_request_in_korean() {
        let rules = ChatRules::standard();
        let (rule, request) = rules.resolve("애니메이션 만들어줘").unwrap();
        assert_eq!(rule.name, "animation");
        assert_eq!(request.tool, "animation_gen");
        assert_eq!(request.action, "launch");
        assert_eq!(request.data_str("prompt"), Some("애니메이션 만들어줘"));
    }

    #[test]
    fn test_layout_and_image_rules() {
        let rules = ChatRules::standard();
        assert_eq!(rules.resolve("메인 화면 레이아웃 잡아줘").unwrap().1.tool, "figma");
        assert_eq!(rules.resolve("이미지 최적화 해줘").unwrap().1.tool, "photoshop");
        assert_eq!(rules.resolve("Optimize this PHOTO").unwrap().1.tool, "photoshop");
    }

    #[test]
    fn test_first_match_wins() {
        let rules = ChatRules::standard();
        // Mentions both an image and a video; the animation rule comes first
        assert_eq!(rules.classify("이미지로 영상 만들어줘").unwrap().name, "animation");
        assert_eq!(rules.classify("layout for the video page").unwrap().name, "animation");
    }

    #[test]
    fn test_generic_verb_alone_does_not_match() {
        let rules = ChatRules::standard();
        assert!(rules.resolve("만들어줘").is_none());
        assert!(rules.resolve("hello there").is_none());
        assert!(rules.resolve("").is_none());
    }

    #[test]
    fn test_fallback_echoes_text() {
        let message = ChatRules::fallback_message("안녕");
        assert!(message.contains("'안녕'"));
        assert!(message.contains("애니메이션"));
    }
}
