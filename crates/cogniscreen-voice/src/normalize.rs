//! Response normalizer: maps raw transcripts to typed profile values.
//!
//! Pure keyword/phrase matching over lightly cleaned input. Returns `None`
//! rather than guessing; the retry policy turns that into a re-ask.

use cogniscreen_core::{AgeGroup, Gender};

/// Saying this word re-asks the current prompt without consuming a retry.
/// Checked by the exchange policy before any normalization.
pub const REPEAT_KEYWORD: &str = "다시";

/// True when the transcript is a request to hear the prompt again.
pub fn is_repeat_request(transcript: &str) -> bool {
    transcript.trim().contains(REPEAT_KEYWORD)
}

/// Name: any non-empty trimmed transcript, verbatim.
pub fn normalize_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Strip whitespace and polite sentence endings ("남자입니다", "여자요") so
/// only the content words remain.
fn strip_politeness(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '입' | '니' | '다' | '요'))
        .collect()
}

/// Gender: substring match against fixed markers; first match wins.
pub fn normalize_gender(raw: &str) -> Option<Gender> {
    let clean = strip_politeness(raw);
    if clean.contains("남성") || clean.contains("남자") {
        Some(Gender::Male)
    } else if clean.contains("여성") || clean.contains("여자") {
        Some(Gender::Female)
    } else if clean.contains("기타") {
        Some(Gender::Other)
    } else {
        None
    }
}

// Ordered (keyword, bracket) table covering digit forms, Sino-Korean numerals,
// and native decade names. Brackets above the sixties collapse into
// SeventiesPlus.
const AGE_KEYWORDS: &[(&str, AgeGroup)] = &[
    ("10", AgeGroup::Teens),
    ("십", AgeGroup::Teens),
    ("열", AgeGroup::Teens),
    ("20", AgeGroup::Twenties),
    ("이십", AgeGroup::Twenties),
    ("스무", AgeGroup::Twenties),
    ("스물", AgeGroup::Twenties),
    ("30", AgeGroup::Thirties),
    ("삼십", AgeGroup::Thirties),
    ("서른", AgeGroup::Thirties),
    ("40", AgeGroup::Forties),
    ("사십", AgeGroup::Forties),
    ("마흔", AgeGroup::Forties),
    ("50", AgeGroup::Fifties),
    ("오십", AgeGroup::Fifties),
    ("쉰", AgeGroup::Fifties),
    ("60", AgeGroup::Sixties),
    ("육십", AgeGroup::Sixties),
    ("예순", AgeGroup::Sixties),
    ("70", AgeGroup::SeventiesPlus),
    ("칠십", AgeGroup::SeventiesPlus),
    ("일흔", AgeGroup::SeventiesPlus),
    ("80", AgeGroup::SeventiesPlus),
    ("팔십", AgeGroup::SeventiesPlus),
    ("여든", AgeGroup::SeventiesPlus),
    ("90", AgeGroup::SeventiesPlus),
    ("구십", AgeGroup::SeventiesPlus),
    ("아흔", AgeGroup::SeventiesPlus),
];

/// Age bracket: strip suffixes ("대", "살", "세", polite endings), then take
/// the longest matching keyword. Longest-match avoids "칠십" resolving to the
/// bare "십" (teens) entry.
pub fn normalize_age_group(raw: &str) -> Option<AgeGroup> {
    let clean: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '대' | '살' | '세' | '요'))
        .collect();
    AGE_KEYWORDS
        .iter()
        .filter(|(keyword, _)| clean.contains(keyword))
        .max_by_key(|(keyword, _)| keyword.chars().count())
        .map(|(_, bracket)| *bracket)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gender_matches_polite_forms() {
        assert_eq!(normalize_gender("남자입니다"), Some(Gender::Male));
        assert_eq!(normalize_gender("여자요"), Some(Gender::Female));
        assert_eq!(normalize_gender("기타 입니다"), Some(Gender::Other));
        assert_eq!(normalize_gender("반갑습니다"), None);
    }

    #[test]
    fn age_group_matches_numeral_and_colloquial_forms() {
        assert_eq!(normalize_age_group("칠십대"), Some(AgeGroup::SeventiesPlus));
        assert_eq!(normalize_age_group("스무살"), Some(AgeGroup::Twenties));
        assert_eq!(normalize_age_group("서른 살이요"), Some(AgeGroup::Thirties));
        assert_eq!(normalize_age_group("40대"), Some(AgeGroup::Forties));
        assert_eq!(normalize_age_group("여든"), Some(AgeGroup::SeventiesPlus));
        assert_eq!(normalize_age_group("백살"), None);
    }

    #[test]
    fn brackets_above_sixties_collapse() {
        for raw in ["70대", "80대", "구십대", "아흔"] {
            assert_eq!(normalize_age_group(raw), Some(AgeGroup::SeventiesPlus));
        }
    }

    #[test]
    fn canonical_spoken_forms_round_trip() {
        for gender in [Gender::Male, Gender::Female, Gender::Other] {
            assert_eq!(normalize_gender(gender.spoken()), Some(gender));
        }
        for bracket in [
            AgeGroup::Teens,
            AgeGroup::Twenties,
            AgeGroup::Thirties,
            AgeGroup::Forties,
            AgeGroup::Fifties,
            AgeGroup::Sixties,
            AgeGroup::SeventiesPlus,
        ] {
            assert_eq!(normalize_age_group(bracket.spoken()), Some(bracket));
        }
    }

    #[test]
    fn name_is_trimmed_passthrough() {
        assert_eq!(normalize_name("  김철수  "), Some("김철수".to_string()));
        assert_eq!(normalize_name("   "), None);
    }

    #[test]
    fn repeat_keyword_detected_anywhere() {
        assert!(is_repeat_request("다시"));
        assert!(is_repeat_request("다시 말씀해주세요"));
        assert!(!is_repeat_request("남자입니다"));
    }
}
