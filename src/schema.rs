//! Survey vintage descriptors
//!
//! Each survey vintage is described by a `VintageSchema`: how its headers are
//! normalised, which columns get sentinel fills, where age/gender/timestamp
//! live, how its columns map onto the canonical vocabulary and which derived
//! features apply. The cleaner and the aligner are driven entirely by these
//! descriptors, so supporting a new vintage means adding one entry to
//! `VINTAGES`.
//!
//! Column references inside a descriptor are written as the source header
//! text and normalised with the vintage's `HeaderStyle` before use.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NON_ALNUM: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
}

/// How raw header text is turned into a column name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStyle {
    /// Trim and lowercase
    Lowercase,
    /// Lowercase, collapse every run of non-alphanumerics into `_`
    SnakeCase,
}

impl HeaderStyle {
    pub fn normalize(&self, raw: &str) -> String {
        let lowered = raw.trim().to_lowercase();
        match self {
            HeaderStyle::Lowercase => lowered,
            HeaderStyle::SnakeCase => NON_ALNUM
                .replace_all(&lowered, "_")
                .trim_matches('_')
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TimestampRule {
    pub column: &'static str,
    /// chrono formats tried in order; date-only formats resolve to midnight
    pub formats: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
pub struct VintageSchema {
    pub year: u16,
    pub label: &'static str,
    pub header_style: HeaderStyle,
    /// Missing cleaner columns are errors when set, warnings otherwise
    pub strict: bool,
    pub fills: &'static [(&'static str, &'static str)],
    /// Sentinel for any text column with more than 30% missing values
    pub sparse_fill: Option<&'static str>,
    pub age_column: &'static str,
    pub gender_column: &'static str,
    pub timestamp: Option<TimestampRule>,
    /// Source header -> canonical column name
    pub renames: &'static [(&'static str, &'static str)],
    pub derive_impact_score: bool,
    pub derive_benefits_flag: bool,
}

impl VintageSchema {
    /// Normalised name of a column referenced by its source header
    pub fn column(&self, raw: &str) -> String {
        self.header_style.normalize(raw)
    }

    /// Canonical renames keyed by normalised source column name
    pub fn canonical_renames(&self) -> Vec<(String, &'static str)> {
        self.renames
            .iter()
            .map(|(raw, canonical)| (self.column(raw), *canonical))
            .collect()
    }
}

/// Share of missing values above which `sparse_fill` applies
pub const SPARSE_THRESHOLD: f64 = 0.3;

pub const SURVEY_2014: VintageSchema = VintageSchema {
    year: 2014,
    label: "Mental Health Survey 2014",
    header_style: HeaderStyle::Lowercase,
    strict: true,
    fills: &[
        ("state", "Unknown"),
        ("self_employed", "Unknown"),
        ("work_interfere", "Unknown"),
        ("comments", "No comments"),
    ],
    sparse_fill: None,
    age_column: "Age",
    gender_column: "Gender",
    timestamp: Some(TimestampRule {
        column: "Timestamp",
        formats: &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d"],
    }),
    renames: &[],
    derive_impact_score: true,
    derive_benefits_flag: false,
};

pub const SURVEY_2016: VintageSchema = VintageSchema {
    year: 2016,
    label: "Mental Health Survey 2016",
    header_style: HeaderStyle::SnakeCase,
    strict: true,
    fills: &[
        ("How many employees does your company or organization have?", "Unknown"),
        ("Is your employer primarily a tech company/organization?", "Unknown"),
    ],
    sparse_fill: Some("Not specified"),
    age_column: "What is your age?",
    gender_column: "What is your gender?",
    timestamp: None,
    renames: &[
        ("Are you self-employed?", "self_employed"),
        ("How many employees does your company or organization have?", "no_employees"),
        ("Is your employer primarily a tech company/organization?", "tech_company"),
        ("Is your primary role within your company related to tech/IT?", "tech_role"),
        ("Does your employer provide mental health benefits as part of healthcare coverage?", "benefits"),
        ("Do you know the options for mental health care available under your employer-provided coverage?", "care_options"),
        ("Has your employer ever formally discussed mental health (for example, as part of a wellness campaign or other official communication)?", "wellness_program"),
        ("Does your employer offer resources to learn more about mental health concerns and options for seeking help?", "seek_help"),
        ("Is your anonymity protected if you choose to take advantage of mental health or substance abuse treatment resources provided by your employer?", "anonymity"),
        ("If a mental health issue prompted you to request a medical leave from work, asking for that leave would be:", "leave"),
        ("Do you think that discussing a mental health disorder with your employer would have negative consequences?", "mental_health_consequence"),
        ("Do you think that discussing a physical health issue with your employer would have negative consequences?", "phys_health_consequence"),
        ("Would you feel comfortable discussing a mental health disorder with your coworkers?", "coworkers"),
        ("Would you feel comfortable discussing a mental health disorder with your direct supervisor(s)?", "supervisor"),
        ("Do you feel that your employer takes mental health as seriously as physical health?", "mental_vs_physical"),
        ("Have you heard of or observed negative consequences for co-workers who have been open about mental health issues in your workplace?", "obs_consequence"),
        ("Do you have medical coverage (private insurance or state-provided) which includes treatment of mental health issues?", "medical_coverage"),
        ("Do you know local or online resources to seek help for a mental health disorder?", "know_resources"),
        ("If you have been diagnosed or treated for a mental health disorder, do you ever reveal this to clients or business contacts?", "reveal_to_clients"),
        ("If you have revealed a mental health issue to a client or business contact, do you believe this has impacted you negatively?", "client_impact"),
        ("If you have been diagnosed or treated for a mental health disorder, do you ever reveal this to coworkers or employees?", "reveal_to_coworkers"),
        ("If you have revealed a mental health issue to a coworker or employee, do you believe this has impacted you negatively?", "coworker_impact"),
        ("Do you believe your productivity is ever affected by a mental health issue?", "productivity_affected"),
        ("If yes, what percentage of your work time (time performing primary or secondary job functions) is affected by a mental health issue?", "productivity_percentage"),
        ("Do you have previous employers?", "previous_employers"),
        ("Have your previous employers provided mental health benefits?", "prev_benefits"),
        ("Were you aware of the options for mental health care provided by your previous employers?", "prev_care_options"),
        ("Did your previous employers ever formally discuss mental health (as part of a wellness campaign or other official communication)?", "prev_wellness_program"),
        ("Did your previous employers provide resources to learn more about mental health issues and how to seek help?", "prev_seek_help"),
        ("Was your anonymity protected if you chose to take advantage of mental health or substance abuse treatment resources with previous employers?", "prev_anonymity"),
        ("Do you think that discussing a mental health disorder with previous employers would have negative consequences?", "prev_mental_health_consequence"),
        ("Do you think that discussing a physical health issue with previous employers would have negative consequences?", "prev_phys_health_consequence"),
        ("Would you have been willing to discuss a mental health issue with your previous co-workers?", "prev_coworkers"),
        ("Would you have been willing to discuss a mental health issue with your direct supervisor(s)?", "prev_supervisor"),
        ("Did you feel that your previous employers took mental health as seriously as physical health?", "prev_mental_vs_physical"),
        ("Did you hear of or observe negative consequences for co-workers with mental health issues in your previous workplaces?", "prev_obs_consequence"),
        ("Would you be willing to bring up a physical health issue with a potential employer in an interview?", "phys_health_interview"),
        ("Why or why not?", "phys_health_interview_why"),
        ("Would you bring up a mental health issue with a potential employer in an interview?", "mental_health_interview"),
        ("Why or why not?.1", "mental_health_interview_why"),
        ("Do you feel that being identified as a person with a mental health issue would hurt your career?", "career_impact"),
        ("Do you think that team members/co-workers would view you more negatively if they knew you suffered from a mental health issue?", "coworker_perception"),
        ("How willing would you be to share with friends and family that you have a mental illness?", "share_with_family"),
        ("Have you observed or experienced an unsupportive or badly handled response to a mental health issue in your current or previous workplace?", "bad_response_experience"),
        ("Have your observations of how another individual who discussed a mental health disorder made you less likely to reveal a mental health issue yourself in your current workplace?", "observation_impact"),
        ("Do you have a family history of mental illness?", "family_history"),
        ("Have you had a mental health disorder in the past?", "past_disorder"),
        ("Do you currently have a mental health disorder?", "current_disorder"),
        ("If yes, what condition(s) have you been diagnosed with?", "diagnosed_condition"),
        ("If maybe, what condition(s) do you believe you have?", "suspected_condition"),
        ("Have you been diagnosed with a mental health condition by a medical professional?", "professional_diagnosis"),
        ("If so, what condition(s) were you diagnosed with?", "professional_diagnosis_details"),
        ("Have you ever sought treatment for a mental health issue from a mental health professional?", "treatment"),
        ("If you have a mental health issue, do you feel that it interferes with your work when being treated effectively?", "treated_interference"),
        ("If you have a mental health issue, do you feel that it interferes with your work when NOT being treated effectively?", "untreated_interference"),
        ("What is your age?", "age"),
        ("What is your gender?", "gender"),
        ("What country do you live in?", "country"),
        ("What US state or territory do you live in?", "state"),
        ("What country do you work in?", "work_country"),
        ("What US state or territory do you work in?", "work_state"),
        ("Which of the following best describes your work position?", "position"),
        ("Do you work remotely?", "remote_work"),
    ],
    derive_impact_score: false,
    derive_benefits_flag: true,
};

pub const SURVEY_2025: VintageSchema = VintageSchema {
    year: 2025,
    label: "Mental Health Survey 2025",
    header_style: HeaderStyle::Lowercase,
    strict: false,
    fills: &[],
    sparse_fill: None,
    age_column: "Age",
    gender_column: "Gender",
    timestamp: Some(TimestampRule {
        column: "Horodateur",
        formats: &["%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M", "%d/%m/%Y"],
    }),
    renames: &[
        ("horodateur", "timestamp"),
        ("are you self-employed?", "self_employed"),
        ("do you have a family history of mental illness?", "family_history"),
        ("have you sought treatment for a mental health condition?", "treatment"),
        ("if you have a mental health condition, do you feel that it interferes with your work?", "work_interfere"),
        ("do you work remotely (outside of an office) at least 50% of the time?", "remote_work"),
        ("is your employer primarily a tech company/organization?", "tech_company"),
        ("does your employer provide mental health benefits?", "benefits"),
        ("do you know the options for mental health care your employer provides?", "care_options"),
        ("has your employer ever discussed mental health as part of an employee wellness program?", "wellness_program"),
        ("does your employer provide resources to learn more about mental health issues and how to seek help?", "seek_help"),
        ("is your anonymity protected if you choose to take advantage of mental health or substance abuse treatment resources?", "anonymity"),
        ("how easy is it for you to take medical leave for a mental health condition?", "leave"),
        ("do you think that discussing a mental health issue with your employer would have negative consequences?", "mental_health_consequence"),
        ("do you think that discussing a physical health issue with your employer would have negative consequences?", "phys_health_consequence"),
        ("would you be willing to discuss a mental health issue with your coworkers?", "coworkers"),
        ("would you be willing to discuss a mental health issue with your supervisors?", "supervisor"),
        ("would you bring up a mental health issue with a potential employer in an interview?", "mental_health_interview"),
        ("would you bring up a physical health issue with a potential employer in an interview?", "phys_health_interview"),
        ("do you feel that your employer takes mental health as seriously as physical health?", "mental_vs_physical"),
        ("have you heard of or observed negative consequences for coworkers with mental health conditions in your workplace?", "obs_consequence"),
        ("any additional notes or comments?", "comments"),
    ],
    derive_impact_score: true,
    derive_benefits_flag: false,
};

/// All vintages, in merge order
const VINTAGES: &[VintageSchema] = &[SURVEY_2014, SURVEY_2016, SURVEY_2025];

pub fn registry() -> &'static [VintageSchema] {
    VINTAGES
}

pub fn lookup(year: u16) -> Option<&'static VintageSchema> {
    VINTAGES.iter().find(|v| v.year == year)
}

// Canonical lookup tables. Values not listed pass through (countries) or fall
// back to "Other" (gender).

pub const COUNTRY_ALIASES: &[(&str, &str)] = &[
    ("United States", "USA"),
    ("United States of America", "USA"),
    ("US", "USA"),
    ("UK", "UK"),
    ("United Kingdom", "UK"),
    ("CA", "Canada"),
    ("DE", "Germany"),
];

pub const GENDER_LABELS: &[(&str, &str)] = &[
    ("female", "Female"),
    ("male", "Male"),
    ("f", "Female"),
    ("m", "Male"),
    ("woman", "Female"),
    ("man", "Male"),
    ("cis female", "Female"),
    ("cis male", "Male"),
    ("trans female", "Other"),
    ("trans male", "Other"),
];

pub const GENDER_FALLBACK: &str = "Other";

/// `work_interfere` answers -> `mh_impact_score`. "Unknown" scores 1, not null.
pub const IMPACT_SCALE: &[(&str, i32)] = &[
    ("Never", 0),
    ("Rarely", 1),
    ("Sometimes", 2),
    ("Often", 3),
    ("Unknown", 1),
];

/// Checked before `FEMALE_KEYWORDS`
pub const MALE_KEYWORDS: &[&str] = &[
    "trans male",
    "trans man",
    "male",
    "m",
    "cis male",
    "man",
    "male (cis)",
    "malr",
    "cis man",
    "make",
    "mail",
];

pub const FEMALE_KEYWORDS: &[&str] = &[
    "trans woman",
    "female (trans)",
    "cis female",
    "trans-female",
    "trans female",
    "female",
    "f",
    "woman",
    "female (cis)",
    "cis woman",
];

pub fn canonical_country(value: &str) -> &str {
    COUNTRY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == value)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(value)
}

pub fn canonical_gender(value: Option<&str>) -> &'static str {
    let Some(value) = value else {
        return GENDER_FALLBACK;
    };
    let token = value.trim().to_lowercase();
    GENDER_LABELS
        .iter()
        .find(|(key, _)| *key == token)
        .map(|(_, label)| *label)
        .unwrap_or(GENDER_FALLBACK)
}

pub fn impact_score(answer: &str) -> Option<i32> {
    IMPACT_SCALE
        .iter()
        .find(|(label, _)| *label == answer)
        .map(|(_, score)| *score)
}

/// Only an explicit "Yes" counts as having benefits
pub fn benefits_flag(answer: Option<&str>) -> i32 {
    match answer {
        Some("Yes") => 1,
        _ => 0,
    }
}
