//! Question bank collaborator. The session controller only depends on the
//! trait; the builtin bank ships a fixed Korean item set covering orientation,
//! recall, calculation, language, and picture naming.

use crate::domain::{Question, QuestionKind};

/// Supplies the ordered question sequence for one session. The contract only
/// requires a stable length matching the configured total; whether the items
/// are deterministic or shuffled per call is up to the implementation.
pub trait QuestionBank: Send + Sync {
    fn session_questions(&self) -> Vec<Question>;
}

/// Fixed builtin item set, in assessment order.
#[derive(Debug, Clone)]
pub struct BuiltinQuestionBank {
    total: usize,
}

impl BuiltinQuestionBank {
    pub const DEFAULT_TOTAL: usize = 10;

    pub fn new() -> Self {
        Self {
            total: Self::DEFAULT_TOTAL,
        }
    }

    /// Limit the session to the first `total` items (at least one).
    pub fn with_total(total: usize) -> Self {
        Self {
            total: total.max(1).min(Self::DEFAULT_TOTAL),
        }
    }

    fn general(id: u32, category: &str, prompt: &str, expected: &str) -> Question {
        Question {
            id,
            category: category.to_string(),
            kind: QuestionKind::General,
            prompt: prompt.to_string(),
            image_ref: None,
            expected_answer: expected.to_string(),
        }
    }

    fn picture(id: u32, prompt: &str, image_ref: &str, expected: &str) -> Question {
        Question {
            id,
            category: "이름대기".to_string(),
            kind: QuestionKind::PictureNaming,
            prompt: prompt.to_string(),
            image_ref: Some(image_ref.to_string()),
            expected_answer: expected.to_string(),
        }
    }

    fn all_items() -> Vec<Question> {
        vec![
            Self::general(1, "지남력", "올해는 몇 년도입니까?", "2026년"),
            Self::general(2, "지남력", "지금은 어느 계절입니까?", "여름"),
            Self::general(3, "기억력", "사과, 버스, 모자. 세 단어를 따라 말씀해주세요.", "사과 버스 모자"),
            Self::general(4, "계산력", "100에서 7을 빼면 얼마입니까?", "93"),
            Self::general(5, "계산력", "93에서 다시 7을 빼면 얼마입니까?", "86"),
            Self::general(6, "언어력", "'백문이 불여일견'은 무슨 뜻입니까?", "직접 보는 것이 낫다"),
            Self::picture(7, "화면에 보이는 그림의 이름을 말씀해주세요.", "items/watch.png", "시계"),
            Self::picture(8, "화면에 보이는 그림의 이름을 말씀해주세요.", "items/umbrella.png", "우산"),
            Self::general(9, "기억력", "조금 전에 따라 말씀하신 세 단어를 다시 말씀해주세요.", "사과 버스 모자"),
            Self::general(10, "판단력", "길에서 주민등록증을 주우면 어떻게 하시겠습니까?", "우체통에 넣거나 경찰서에 가져다 준다"),
        ]
    }
}

impl Default for BuiltinQuestionBank {
    fn default() -> Self {
        Self::new()
    }
}

impl QuestionBank for BuiltinQuestionBank {
    fn session_questions(&self) -> Vec<Question> {
        let mut items = Self::all_items();
        items.truncate(self.total);
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bank_has_ten_items_in_order() {
        let bank = BuiltinQuestionBank::new();
        let items = bank.session_questions();
        assert_eq!(items.len(), 10);
        for (i, q) in items.iter().enumerate() {
            assert_eq!(q.id, (i + 1) as u32);
        }
    }

    #[test]
    fn length_is_stable_across_calls() {
        let bank = BuiltinQuestionBank::with_total(4);
        assert_eq!(bank.session_questions().len(), 4);
        assert_eq!(bank.session_questions().len(), 4);
    }

    #[test]
    fn picture_items_carry_image_refs() {
        let items = BuiltinQuestionBank::new().session_questions();
        for q in items {
            match q.kind {
                QuestionKind::PictureNaming => assert!(q.image_ref.is_some()),
                QuestionKind::General => assert!(q.image_ref.is_none()),
            }
        }
    }
}
