//! Application constants and runtime configuration.
//!
//! Every anchor, pattern, keyword table and boilerplate phrase the extractors
//! use has a default here. A JSON file may override any section; fields it
//! omits keep their defaults. Patterns are plain strings at this level and are
//! compiled once when the family extractors are built.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroizing;

/// Application-level constants
pub const APP_NAME: &str = "assessment-parser";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable consulted first for the pseudonymization secret.
pub const SECRET_ENV_VAR: &str = "ASSESSMENT_PARSER_SECRET";

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "assessment_parser=info"
}

/// Filter used by `--verbose`.
pub fn verbose_log_filter() -> &'static str {
    "assessment_parser=debug"
}

// ═══════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No pseudonymization secret: set ASSESSMENT_PARSER_SECRET or identity.secret")]
    MissingSecret,

    #[error("Invalid pattern in {field}: {source}")]
    InvalidPattern {
        field: String,
        #[source]
        source: regex::Error,
    },
}

impl ConfigError {
    pub fn pattern(field: &str) -> impl FnOnce(regex::Error) -> ConfigError + '_ {
        move |source| ConfigError::InvalidPattern {
            field: field.to_string(),
            source,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Top-level configuration
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub identity: IdentityConfig,
    pub clinical_card: ClinicalCardConfig,
    pub php_daily: PhpDailyConfig,
    pub biopsychosocial: BiopsychosocialConfig,
    pub ahcm: AhcmConfig,
    pub substance_history: SubstanceHistoryConfig,
}

impl ParserConfig {
    /// Load from a JSON file, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                Ok(serde_json::from_str(&raw)?)
            }
            None => Ok(Self::default()),
        }
    }

    /// Resolve the pseudonymization secret: environment first, then the file.
    pub fn resolve_secret(&self) -> Result<Zeroizing<String>, ConfigError> {
        let from_env = std::env::var(SECRET_ENV_VAR).ok().map(Zeroizing::new);
        self.resolve_secret_from(from_env)
    }

    fn resolve_secret_from(
        &self,
        from_env: Option<Zeroizing<String>>,
    ) -> Result<Zeroizing<String>, ConfigError> {
        if let Some(secret) = from_env.filter(|s| !s.trim().is_empty()) {
            return Ok(secret);
        }
        match self.identity.secret.as_deref() {
            Some(secret) if !secret.trim().is_empty() => Ok(Zeroizing::new(secret.to_string())),
            _ => Err(ConfigError::MissingSecret),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Identity
// ═══════════════════════════════════════════════════════════

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Filename pattern; capture group 1 (or the whole match) is the raw key.
    pub filename_pattern: String,
    #[serde(skip_serializing)]
    pub secret: Option<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            filename_pattern: r"(?i)_(LO-\d{4}-\d{1,3})_".into(),
            secret: None,
        }
    }
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("filename_pattern", &self.filename_pattern)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════
// Shared shapes
// ═══════════════════════════════════════════════════════════

/// One canonical category and the surface words that signal it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCategory {
    pub name: String,
    pub synonyms: Vec<String>,
}

fn keyword_table(entries: &[(&str, &[&str])]) -> Vec<KeywordCategory> {
    entries
        .iter()
        .map(|(name, synonyms)| KeywordCategory {
            name: name.to_string(),
            synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
        })
        .collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ═══════════════════════════════════════════════════════════
// Daily clinical card
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicalCardConfig {
    /// Page anchor; capture group 1 is the assessment date.
    pub anchor: String,
    /// Column prefixes for the first tables on the anchor page, in order.
    pub table_prefixes: Vec<String>,
}

impl Default for ClinicalCardConfig {
    fn default() -> Self {
        Self {
            anchor: r"Daily Clinical Card\s+(\d{2}/\d{2}/\d{4})".into(),
            table_prefixes: strings(&["emo_", "sup_", "cop_"]),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// PHP daily assessment
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhpDailyConfig {
    /// Assessment header; capture group 1 is the assessment date.
    pub header: String,
    /// Signature line closing each assessment body.
    pub terminator: String,
    pub craving: String,
    pub emotions: Vec<KeywordCategory>,
    pub skills: Vec<KeywordCategory>,
    pub supports: Vec<KeywordCategory>,
}

impl Default for PhpDailyConfig {
    fn default() -> Self {
        Self {
            header: r"PHP Daily Assessment (\d{2}/\d{2}/\d{4}) \d{2}:\d{2} [AP]M".into(),
            terminator: r"\n\w+ \w+, ACSW\d+".into(),
            craving: r"(?i)Cravings?/impulse.*?:\s*(\d{1,2})/10".into(),
            emotions: keyword_table(&[
                ("Pain", &["pain", "pains", "painful", "hurt", "hurts", "hurting", "sore", "soreness", "ache", "discomfort"]),
                ("Sad", &["sad", "sadder", "saddest", "downhearted", "heartbroken", "mournful", "grief", "sorrow"]),
                ("Content", &["contentment", "content", "pleased", "satisfied"]),
                ("Anger", &["anger", "angry", "rage", "enraged", "fury", "furious", "fuming"]),
                ("Shame", &["shame", "ashamed", "guilt", "guilty"]),
                ("Fear", &["fear", "fearful", "scared", "scary", "frightened", "terrified"]),
                ("Joy", &["joy", "joyful", "happy", "cheerful", "joyous"]),
                ("Anxiety", &["anxiety", "anxious", "nervous", "uneasy", "restless", "apprehensive", "worry", "stress", "tense", "worried"]),
                ("Depressed", &["depressed", "depress", "depression"]),
                ("Alone", &["alone", "lonely", "loneliness", "isolated", "abandoned"]),
            ]),
            skills: keyword_table(&[
                ("Mindfulness/Meditation", &["mindful", "mindfulness", "meditate", "meditation"]),
                ("Distress Tolerance", &["distress", "tolerate", "tolerance"]),
                ("Opposite Action", &["opposite action", "opposite"]),
                ("Take My Meds", &["take my meds", "take meds", "take my med", "take med"]),
                ("Ask For Help", &["ask for help", "ask help", "seek help"]),
                ("Improve Moment", &["improve moment", "improve the moment"]),
                ("Parts Work", &["parts work", "part work", "parts works", "part works"]),
                ("Play The Tape Thru", &["play the tape thru", "play tape thru", "play the tape through", "play tape through"]),
                ("Values", &["value", "values"]),
            ]),
            supports: keyword_table(&[
                ("Sleep", &["sleep", "slept"]),
                ("Nutrition", &["nutrition"]),
                ("Exercise", &["exercise", "workout", "work out"]),
                ("Fun", &["fun"]),
                ("Connection", &["connection"]),
                ("Warmth", &["warmth"]),
                ("Water", &["water"]),
                ("Love", &["love"]),
                ("Therapy", &["therapy"]),
            ]),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Biopsychosocial assessment
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BiopsychosocialConfig {
    pub assessment_date: String,
    pub birthdate: String,
    /// `chrono` format of both dates.
    pub date_format: String,
    pub motivation_start: String,
    pub motivation_end: String,
    pub prev_treatments: String,
    pub drugs_of_choice: String,
    pub craving_score: String,
    pub scores_start: String,
    pub scores_end: String,
}

impl Default for BiopsychosocialConfig {
    fn default() -> Self {
        Self {
            assessment_date: r"Biopsychosocial Assessment\s*(\d{1,2}/\d{1,2}/\d{4})".into(),
            birthdate: r"Birthdate:\s*(\d{1,2}/\d{1,2}/\d{4})".into(),
            date_format: "%m/%d/%Y".into(),
            motivation_start: "X. TREATMENT ACCEPTANCE / RESISTANCE DIMENSION".into(),
            motivation_end: "3. Relapse/Continued Use Potential".into(),
            prev_treatments: r"Number of Times:\s*(\d+)".into(),
            drugs_of_choice: "List Drugs of Choice:".into(),
            craving_score: r"\(Range 0-10, 10 being highest\)\s*(\d+)(?:/10)?".into(),
            scores_start: "JUDGMENT:".into(),
            scores_end: "List Problems Identified in Bio-Psychosocial:".into(),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// AHCM social-needs survey
// ═══════════════════════════════════════════════════════════

/// A canonical survey question and the output column its answers land in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionColumn {
    pub column: String,
    pub question: String,
}

fn question_columns(entries: &[(&str, &str)]) -> Vec<QuestionColumn> {
    entries
        .iter()
        .map(|(column, question)| QuestionColumn {
            column: column.to_string(),
            question: question.to_string(),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AhcmConfig {
    pub anchor: String,
    /// Where the question scan restarts when present in the section.
    pub first_question: String,
    pub max_question: u32,
    /// Question whose answer holds an `a.`/`b.` sub-question pair.
    pub split_question: Option<u32>,
    /// Phrases removed verbatim from every question and answer.
    pub boilerplate: Vec<String>,
    pub questions: Vec<QuestionColumn>,
    pub abuse_labels: Vec<String>,
    pub substance_labels: Vec<String>,
    pub screening_labels: Vec<String>,
    pub financial_prompt: String,
    /// Exercise answers above this value are reported as `N/A`.
    pub exercise_limit: i64,
    pub point_total: String,
}

impl Default for AhcmConfig {
    fn default() -> Self {
        Self {
            anchor: "Who should use the AHC HRSN Screening Tool?".into(),
            first_question: "1. What is your living situation today?".into(),
            max_question: 26,
            split_question: Some(23),
            boilerplate: strings(&[
                "Living Situation", "Food", "Transportation", "Utilities", "Safety",
                "Financial Strain", "Employment", "Family and Community Support", "Education",
                "Physical Activity", "Substance Use", "Mental Health", "Disabilities",
                "Choose all the apply",
                "Please answer whether the statements were OFTEN, SOMETIMES, or NEVER true for you and your household in the last 12 months.",
                "Calculate [“number of days” selected] x [“number of minutes” selected] = [number of minutes of exercise per week] 2. Apply the right age threshold: Under 6 years old: You can’t find the physical activity need for people under 6. Age 6 to 17: Less than an average of 60 minutes a day shows an HRSN. Age 18 or older: Less than 150 minutes a week shows an HRSN.",
                "Some people have made the following statements about their food situation",
                "Because violence and abuse happens to a lot of people and affects their health",
                "For example, starting or completing job training or getting a high school diploma, GED or equivalent.",
                "Point Total:()",
                "when the numerical values for answers to questions 3-10 are added shows that the person might not be safe.",
                "A score of 11 or more",
                "Follow these 2 steps to decide",
                "The next questions relate to your experience with alcohol, cigarettes, and other drugs",
                "If you get 3 or more when you add the answers to questions 23a and 23b",
                "One drink is 12 ounces of beer, 5 ounces of wine, or 1.5 ounces of 80-proof spirits.",
            ]),
            questions: question_columns(&[
                ("living_situation", "What is your living situation today?"),
                ("housing_problems", "Think about the place you live. Do you have problems with any of the following?"),
                ("food_insecurity_and_transport_issues", "In the past 12 months, has lack of reliable transportation kept you from medical appointments, mettings, work or from getting things needed for daily living?"),
                ("food_insecurity_and_transport_issues", "In the past 12 months, has lack of reliable transportation kept you from medical appointments, meetings, work or from getting things needed for daily living?"),
                ("utility_shutoff_threat", "In the past 12 months has the electric, gas, oil, or water company threatened to shut off services in your home?"),
                ("abuse_physical", "How often does anyone, including family and friends, physically hurt you?"),
                ("abuse_verbal", "How often does anyone, including family and friends, insult or talk down to you?"),
                ("abuse_threats", "How often does anyone, including family and friends, threaten you with harm?"),
                ("abuse_yelling", "How often does anyone, including family and friends, scream or curse at you?"),
                ("financial_strain", "How hard is it for you to pay for the very basics like food, housing, medical care, and heating?"),
                ("want_work_help", "Do you want help finding or keeping work or a job?"),
                ("need_daily_help", "If for any reason you need help with day to day activities such as bathing, preparing meals, shopping, managing finances, etc., do you get the help you need?"),
                ("feel_lonely", "How often do you feel lonely or isolated from those around you?"),
                ("non_english_at_home", "Do you speak a language other than English at home?"),
                ("want_school_help", "Do you want help with school or training?"),
                ("exercise_days_per_week", "In the last 30 days, other than the activities you did for work, on average, how many days per week did you engage in moderate exercise (like walking fast, running, jogging, dancing, swimming, biking, or other similar activities)?"),
                ("exercise_minutes_per_day", "On average, how many minutes did you usually spend exercising at this level on one of those days?"),
                ("binge_drinking", "How many times in the past 12 months have you had 5 or more drinks in a day (males) or 4 or more drinks in a day (females)?"),
                ("tobacco_use", "How many times in the past 12 months have you used tobacco products (like cigarettes, cigars, snuff, chew, electronic cigarettes)?"),
                ("prescription_misuse", "How many times in the past year have you used prescription drugs for non medical reasons?"),
                ("illegal_drug_use_count", "How many times in the past year have you used illegal drugs?"),
                ("mental_health_score", "Over the past 2 weeks, how often have you been bothered by any of the following problems?"),
                ("mental_health_interest", "Over the past 2 weeks, how often have you been bothered by any of the following problems? Little interest or pleasure in doing things?"),
                ("mental_health_depressed", "Over the past 2 weeks, how often have you been bothered by any of the following problems? Feeling down, depressed, or hopeless?"),
                ("current_stress", "Stress means a situation in which a person feels tense, restless, nervous, or anxious, or is unable to sleep at night because his or her mind is troubled all the time. Do you feel this kind of stress these days?"),
                ("cognitive_difficulty", "Because of a physical, mental or emotional condition, do you have serious difficulty concentrating, remembering or making decisions?"),
                ("errand_difficulty", "Because of a physical, mental or emotional condition, do you have difficulty doing errands alone such as visiting a doctor's office or shopping?"),
                ("shutoff_notice", "Shutoff Notice"),
            ]),
            abuse_labels: strings(&["Frequently", "Fairly Often", "Sometimes", "Rarely", "Never"]),
            substance_labels: strings(&["Daily or Almost Daily", "Weekly", "Monthly", "Once or Twice", "Never"]),
            screening_labels: strings(&["Nearly every day", "More than half the days", "Several days", "Not at all"]),
            financial_prompt: "Would you say it is:".into(),
            exercise_limit: 150,
            point_total: r"Point Total:\s*\((\d+)\)".into(),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Substance use history
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubstanceHistoryConfig {
    pub anchor: String,
    /// Line pattern that closes the section (the next roman-numeral heading).
    pub terminator: String,
    /// Raw pattern-of-use text → canonical bucket.
    pub pattern_of_use: BTreeMap<String, String>,
}

impl Default for SubstanceHistoryConfig {
    fn default() -> Self {
        let pattern_of_use = [
            ("continued", "Continued"),
            ("Continued", "Continued"),
            ("contunued", "Continued"),
            ("Binge, continued", "Binge/Continued"),
            ("Binge episodes", "Binge/Episodic"),
            ("binge/episodic", "Binge/Episodic"),
            ("episodic", "Binge/Episodic"),
            ("Episodic/binge", "Binge/Episodic"),
            ("Episodic or binge", "Binge/Episodic"),
            ("Binge", "Binge/Episodic"),
            ("Binges", "Binge/Episodic"),
            ("experimental", "Experimental"),
            ("social", "Experimental"),
            ("socially", "Experimental"),
            ("recreational", "Experimental"),
            ("recreationally", "Experimental"),
            ("daily", "Daily"),
            ("na", "NA"),
            ("NA", "NA"),
            ("N/A", "NA"),
            ("prescribed prn", "Prescribed"),
            ("as prescribed for sleep", "Prescribed"),
            ("for surgery", "Prescribed"),
            ("once in a while", "Experimental"),
            ("mental and emotional", "Prescribed"),
            ("ocationally", "Occasionally"),
            ("trail", "Experimental"),
        ]
        .into_iter()
        .map(|(raw, canonical)| (raw.to_string(), canonical.to_string()))
        .collect();

        Self {
            anchor: "IV. SUBSTANCE USE HISTORY & ASSESSMENT".into(),
            terminator: r"^\s*V\.\s".into(),
            pattern_of_use,
        }
    }
}
