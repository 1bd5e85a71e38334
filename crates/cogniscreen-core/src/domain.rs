//! Core domain types for one assessment interview: the user profile collected
//! at the start of a session, the question sequence, the per-question answers,
//! and the immutable `TestResult` handed to the result store at completion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Transcript sentinel recorded when a question received no usable answer.
pub const NO_ANSWER_TRANSCRIPT: &str = "답변 없음";

/// Self-reported gender of the interviewee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    /// Canonical spoken form, as the interview prompts say it.
    pub fn spoken(&self) -> &'static str {
        match self {
            Gender::Male => "남성",
            Gender::Female => "여성",
            Gender::Other => "기타",
        }
    }
}

/// Age bracket of the interviewee. Brackets at seventy and above are collapsed
/// into a single value; the assessment does not distinguish beyond that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgeGroup {
    Teens,
    Twenties,
    Thirties,
    Forties,
    Fifties,
    Sixties,
    SeventiesPlus,
}

impl AgeGroup {
    /// Canonical spoken form, as the interview prompts say it.
    pub fn spoken(&self) -> &'static str {
        match self {
            AgeGroup::Teens => "10대",
            AgeGroup::Twenties => "20대",
            AgeGroup::Thirties => "30대",
            AgeGroup::Forties => "40대",
            AgeGroup::Fifties => "50대",
            AgeGroup::Sixties => "60대",
            AgeGroup::SeventiesPlus => "70대 이상",
        }
    }
}

/// Completed user profile. Immutable once built; construct via [`ProfileDraft`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub gender: Gender,
    pub age_group: AgeGroup,
}

/// Incrementally collected profile. Each field is set at most once, in the
/// fixed order the session asks for them (name, gender, age group).
#[derive(Debug, Clone, Default)]
pub struct ProfileDraft {
    name: Option<String>,
    gender: Option<Gender>,
    age_group: Option<AgeGroup>,
}

impl ProfileDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_name(&mut self, name: String) {
        if self.name.is_none() {
            self.name = Some(name);
        }
    }

    pub fn set_gender(&mut self, gender: Gender) {
        if self.gender.is_none() {
            self.gender = Some(gender);
        }
    }

    pub fn set_age_group(&mut self, age_group: AgeGroup) {
        if self.age_group.is_none() {
            self.age_group = Some(age_group);
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Finish the draft. Returns `None` while any field is still missing.
    pub fn finish(&self) -> Option<UserProfile> {
        Some(UserProfile {
            name: self.name.clone()?,
            gender: self.gender?,
            age_group: self.age_group?,
        })
    }
}

/// Kind of question: plain spoken question, or naming an object from a picture
/// shown by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionKind {
    General,
    PictureNaming,
}

/// One item of the assessment, supplied by the question bank as part of a
/// fixed-length, ordered sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: u32,
    pub category: String,
    pub kind: QuestionKind,
    pub prompt: String,
    /// For `PictureNaming` items: reference the presentation layer resolves to an image.
    pub image_ref: Option<String>,
    pub expected_answer: String,
}

/// Scored answer to one question. Appended exactly once per question, in
/// question order, and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: u32,
    /// What the interviewee said, or [`NO_ANSWER_TRANSCRIPT`].
    pub transcript: String,
    /// 1 for correct, 0 otherwise.
    pub score: u8,
    pub explanation: String,
}

/// Immutable result of one completed session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    /// Unique per session (creation timestamp in RFC 3339).
    pub id: String,
    pub profile: UserProfile,
    pub answers: Vec<Answer>,
    pub total_score: u32,
    pub created_at: DateTime<Utc>,
}

impl TestResult {
    /// Assemble the final record. The total score is derived here, never
    /// supplied by the caller.
    pub fn new(profile: UserProfile, answers: Vec<Answer>) -> Self {
        let created_at = Utc::now();
        let total_score = answers.iter().map(|a| u32::from(a.score)).sum();
        Self {
            id: created_at.to_rfc3339(),
            profile,
            answers,
            total_score,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(id: u32, score: u8) -> Answer {
        Answer {
            question_id: id,
            transcript: "테스트".to_string(),
            score,
            explanation: String::new(),
        }
    }

    #[test]
    fn draft_requires_all_fields() {
        let mut draft = ProfileDraft::new();
        assert!(draft.finish().is_none());
        draft.set_name("김철수".to_string());
        draft.set_gender(Gender::Male);
        assert!(draft.finish().is_none());
        draft.set_age_group(AgeGroup::Sixties);
        let profile = draft.finish().unwrap();
        assert_eq!(profile.name, "김철수");
        assert_eq!(profile.age_group, AgeGroup::Sixties);
    }

    #[test]
    fn draft_fields_set_once() {
        let mut draft = ProfileDraft::new();
        draft.set_name("첫번째".to_string());
        draft.set_name("두번째".to_string());
        assert_eq!(draft.name(), Some("첫번째"));
    }

    #[test]
    fn total_score_is_sum_of_answer_scores() {
        let profile = UserProfile {
            name: "김철수".to_string(),
            gender: Gender::Male,
            age_group: AgeGroup::Fifties,
        };
        let result = TestResult::new(profile, vec![answer(1, 1), answer(2, 0), answer(3, 1)]);
        assert_eq!(result.total_score, 2);
        assert!(result.answers.iter().all(|a| a.score <= 1));
    }
}
