//! Grammar and usage questions built from fixed template tables.
//!
//! Each grade band owns a list of template groups. A group has one of
//! three shapes: subject agreement (the verb form follows from the
//! subject), word transformation (a lookup table of correct forms and
//! their common misspellings) and sentence choice (a stem whose first
//! option is the correct one).

use serde::Serialize;

use crate::errors::QuizError;
use crate::grade::{Grade, GradeBand};
use crate::log_generation;
use crate::models::{Difficulty, Question, Subject};
use crate::random::RandomSource;
use crate::validator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GrammarTopic {
    SubjectVerbAgreement,
    Pluralization,
    ArticleChoice,
    PastTense,
    Pronouns,
    VerbTense,
    Comparatives,
    SentenceStructure,
    ModifierPlacement,
    ClauseConnectors,
    SubjunctiveMood,
    ParallelStructure,
}

/// A sentence whose blank takes either the base or the third-person form
/// of a verb. `pattern` contains a `{subject}` placeholder.
#[derive(Debug, Clone, Copy)]
pub struct AgreementSentence {
    pub pattern: &'static str,
    pub base: &'static str,
    pub third_person: &'static str,
    pub confusables: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
pub struct WordForm {
    pub word: &'static str,
    pub correct: &'static str,
    pub distractors: &'static [&'static str],
}

/// A stem with its options; `options[0]` is the correct one.
#[derive(Debug, Clone, Copy)]
pub struct SentenceChoice {
    pub text: &'static str,
    pub options: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
pub enum TemplateShape {
    SubjectAgreement {
        lead: &'static str,
        subjects: &'static [&'static str],
        sentences: &'static [AgreementSentence],
    },
    WordTransformation {
        /// Contains a `{word}` placeholder.
        prompt: &'static str,
        forms: &'static [WordForm],
    },
    SentenceChoice {
        lead: &'static str,
        sentences: &'static [SentenceChoice],
    },
}

#[derive(Debug, Clone, Copy)]
pub struct TemplateGroup {
    pub topic: GrammarTopic,
    pub hint: &'static str,
    pub shape: TemplateShape,
}

const IRREGULAR_PLURALS: &[&str] = &[
    "children", "people", "men", "women", "mice", "feet", "teeth", "geese",
];

/// Whether a subject takes the base verb form ("they go") rather than the
/// third-person singular ("she goes").
pub fn takes_base_form(subject: &str) -> bool {
    let lower = subject.trim().to_lowercase();
    match lower.as_str() {
        "i" | "you" | "we" | "they" => return true,
        "he" | "she" | "it" => return false,
        _ => {}
    }
    let head = lower.rsplit(' ').next().unwrap_or(lower.as_str());
    IRREGULAR_PLURALS.contains(&head)
        || (head.ends_with('s') && !head.ends_with("ss") && !head.ends_with("us"))
}

static ELEMENTARY_1: &[TemplateGroup] = &[
    TemplateGroup {
        topic: GrammarTopic::SubjectVerbAgreement,
        hint: "He, she, it and one person or thing take the -s form (goes); I, you, we, they and plural nouns take the base form (go)",
        shape: TemplateShape::SubjectAgreement {
            lead: "Choose the correct verb:",
            subjects: &[
                "He", "She", "They", "We", "I", "You", "The boy", "The girls", "My friends",
                "The cat",
            ],
            sentences: &[
                AgreementSentence {
                    pattern: "{subject} _____ to school.",
                    base: "go",
                    third_person: "goes",
                    confusables: &["going", "gone"],
                },
                AgreementSentence {
                    pattern: "{subject} _____ outside after lunch.",
                    base: "play",
                    third_person: "plays",
                    confusables: &["playing", "to play"],
                },
                AgreementSentence {
                    pattern: "{subject} _____ apples.",
                    base: "like",
                    third_person: "likes",
                    confusables: &["liking", "to like"],
                },
            ],
        },
    },
    TemplateGroup {
        topic: GrammarTopic::Pluralization,
        hint: "Remember special plural rules: -s, -es, -ies, -ves and irregular forms",
        shape: TemplateShape::WordTransformation {
            prompt: "What is the plural form of \"{word}\"?",
            forms: &[
                WordForm { word: "cat", correct: "cats", distractors: &["cat's", "cates", "cat"] },
                WordForm { word: "box", correct: "boxes", distractors: &["boxs", "box's", "box"] },
                WordForm { word: "puppy", correct: "puppies", distractors: &["puppys", "puppy's", "puppy"] },
                WordForm { word: "dish", correct: "dishes", distractors: &["dishs", "dish's", "dish"] },
                WordForm { word: "child", correct: "children", distractors: &["childs", "child's", "childrens"] },
                WordForm { word: "foot", correct: "feet", distractors: &["foots", "foot's", "feets"] },
                WordForm { word: "mouse", correct: "mice", distractors: &["mouses", "mouse's", "mices"] },
                WordForm { word: "tooth", correct: "teeth", distractors: &["tooths", "tooth's", "teeths"] },
                WordForm { word: "leaf", correct: "leaves", distractors: &["leafs", "leaf's", "leavs"] },
            ],
        },
    },
    TemplateGroup {
        topic: GrammarTopic::ArticleChoice,
        hint: "Use 'a' before consonant sounds, 'an' before vowel sounds",
        shape: TemplateShape::SentenceChoice {
            lead: "Choose the correct article:",
            sentences: &[
                SentenceChoice { text: "I saw _____ elephant at the zoo.", options: &["an", "a", "the"] },
                SentenceChoice { text: "She has _____ umbrella.", options: &["an", "a", "the"] },
                SentenceChoice { text: "We waited for _____ hour.", options: &["an", "a", "the"] },
                SentenceChoice { text: "My brother is _____ university student.", options: &["a", "an", "the"] },
            ],
        },
    },
];

static ELEMENTARY_2: &[TemplateGroup] = &[
    TemplateGroup {
        topic: GrammarTopic::PastTense,
        hint: "Think about what happened in the past - regular or irregular verb?",
        shape: TemplateShape::SentenceChoice {
            lead: "Choose the correct past tense:",
            sentences: &[
                SentenceChoice { text: "Yesterday, I _____ my homework.", options: &["did", "done", "doing", "does"] },
                SentenceChoice { text: "Last week, she _____ to the park.", options: &["went", "gone", "going", "goes"] },
                SentenceChoice { text: "They _____ the whole pizza.", options: &["ate", "eaten", "eating", "eats"] },
                SentenceChoice { text: "We _____ a song at the concert.", options: &["sang", "sung", "singing", "sings"] },
                SentenceChoice { text: "He _____ the ball over the fence.", options: &["threw", "thrown", "throwing", "throws"] },
            ],
        },
    },
    TemplateGroup {
        topic: GrammarTopic::Pronouns,
        hint: "Think about the pronoun's role in the sentence (subject, object, possessive)",
        shape: TemplateShape::SentenceChoice {
            lead: "Choose the correct pronoun:",
            sentences: &[
                SentenceChoice { text: "_____ gave me the book.", options: &["He", "Him", "His", "Himself"] },
                SentenceChoice { text: "_____ and I went to the store.", options: &["She", "Her", "Hers", "Herself"] },
                SentenceChoice { text: "The book belongs to _____.", options: &["them", "they", "their", "themselves"] },
                SentenceChoice { text: "_____ are my best friends.", options: &["They", "Them", "Their", "Themselves"] },
                SentenceChoice { text: "Please give the keys to _____.", options: &["me", "I", "mine", "myself"] },
            ],
        },
    },
];

static INTERMEDIATE_1: &[TemplateGroup] = &[
    TemplateGroup {
        topic: GrammarTopic::VerbTense,
        hint: "Consider the timeline - when did/does/will the action happen?",
        shape: TemplateShape::SentenceChoice {
            lead: "Choose the correct verb tense:",
            sentences: &[
                SentenceChoice { text: "By next week, I _____ the project.", options: &["will have finished", "will finish", "finished", "have finished"] },
                SentenceChoice { text: "She _____ for three hours when I called.", options: &["had been studying", "was studying", "studied", "has studied"] },
                SentenceChoice { text: "They _____ in Paris for five years now.", options: &["have lived", "lived", "are living", "were living"] },
                SentenceChoice { text: "I _____ dinner when the phone rang.", options: &["was cooking", "cooked", "am cooking", "have cooked"] },
            ],
        },
    },
    TemplateGroup {
        topic: GrammarTopic::Comparatives,
        hint: "For comparisons: short words add -er/-est, long words use more/most",
        shape: TemplateShape::SentenceChoice {
            lead: "Choose the correct comparative/superlative form:",
            sentences: &[
                SentenceChoice { text: "This book is _____ than that one.", options: &["more interesting", "interestinger", "most interesting", "much interesting"] },
                SentenceChoice { text: "Mount Everest is the _____ mountain in the world.", options: &["highest", "more high", "most high", "higher"] },
                SentenceChoice { text: "Today is _____ than yesterday.", options: &["colder", "more cold", "coldest", "most cold"] },
                SentenceChoice { text: "She is the _____ player on the team.", options: &["most talented", "talentedest", "more talented", "talenteder"] },
            ],
        },
    },
];

static INTERMEDIATE_2: &[TemplateGroup] = &[
    TemplateGroup {
        topic: GrammarTopic::SentenceStructure,
        hint: "Consider subject-verb agreement and proper clause structure",
        shape: TemplateShape::SentenceChoice {
            lead: "Choose the correct sentence structure:",
            sentences: &[
                SentenceChoice { text: "Neither of the students _____ the answer.", options: &["knows", "know", "have known", "are knowing"] },
                SentenceChoice { text: "The team, along with their coach, _____ arriving tomorrow.", options: &["is", "are", "were", "have been"] },
                SentenceChoice { text: "Each of the boxes _____ a label.", options: &["needs", "need", "are needing", "have needed"] },
                SentenceChoice { text: "Everyone in the class _____ finished the test.", options: &["has", "have", "are", "were"] },
            ],
        },
    },
    TemplateGroup {
        topic: GrammarTopic::ModifierPlacement,
        hint: "Place modifiers close to what they modify to avoid confusion",
        shape: TemplateShape::SentenceChoice {
            lead: "Choose the correct modifier placement:",
            sentences: &[
                SentenceChoice { text: "_____ running through the park, I saw a rare bird.", options: &["While", "During", "After", "Before"] },
                SentenceChoice { text: "Walking to school, _____.", options: &["I saw a rainbow", "a rainbow appeared", "the rainbow was seen", "there was a rainbow"] },
            ],
        },
    },
];

static ADVANCED_1: &[TemplateGroup] = &[TemplateGroup {
    topic: GrammarTopic::ClauseConnectors,
    hint: "Consider the logical relationship between clauses",
    shape: TemplateShape::SentenceChoice {
        lead: "Choose the correct clause connector:",
        sentences: &[
            SentenceChoice { text: "_____ I studied hard, I passed the test.", options: &["Because", "Despite", "However", "Otherwise"] },
            SentenceChoice { text: "The project, _____ was completed last week, won an award.", options: &["which", "that", "what", "whose"] },
            SentenceChoice { text: "_____ the rain, the game continued.", options: &["Despite", "Because", "Unless", "Whether"] },
            SentenceChoice { text: "She stayed home _____ she was feeling sick.", options: &["because", "although", "unless", "whereas"] },
            SentenceChoice { text: "_____ you finish your work, you cannot go outside.", options: &["Unless", "Because", "Although", "Since"] },
        ],
    },
}];

static ADVANCED_2: &[TemplateGroup] = &[
    TemplateGroup {
        topic: GrammarTopic::SubjunctiveMood,
        hint: "Use subjunctive for wishes, suggestions, and hypothetical situations",
        shape: TemplateShape::SentenceChoice {
            lead: "Choose the correct subjunctive mood:",
            sentences: &[
                SentenceChoice { text: "I wish I _____ there to help.", options: &["were", "was", "am", "be"] },
                SentenceChoice { text: "The teacher suggested that he _____ the assignment.", options: &["submit", "submits", "submitted", "had submitted"] },
                SentenceChoice { text: "If I _____ a million dollars, I would travel the world.", options: &["had", "have", "would have", "will have"] },
                SentenceChoice { text: "It is essential that every student _____ on time.", options: &["arrive", "arrives", "arrived", "is arriving"] },
            ],
        },
    },
    TemplateGroup {
        topic: GrammarTopic::ParallelStructure,
        hint: "Keep similar ideas in similar grammatical forms",
        shape: TemplateShape::SentenceChoice {
            lead: "Choose the correct parallel structure:",
            sentences: &[
                SentenceChoice {
                    text: "The candidate's goals were _____",
                    options: &[
                        "to increase sales, to reduce costs, and to improve quality",
                        "increasing sales, reducing costs, and quality improvement",
                        "to increase sales, reducing costs, and quality improvement",
                        "increasing sales, to reduce costs, and improving quality",
                    ],
                },
                SentenceChoice {
                    text: "The job requires _____ .",
                    options: &[
                        "attention to detail, ability to multitask, and excellent communication",
                        "being detail-oriented, multitasking, and to communicate well",
                        "attention to detail, multitasking abilities, and communicates well",
                        "being detailed, able to multitask, and good communication",
                    ],
                },
                SentenceChoice {
                    text: "She likes hiking, swimming, and _____.",
                    options: &["biking", "to bike", "she bikes", "a bike ride"],
                },
            ],
        },
    },
];

pub fn template_groups(band: GradeBand) -> &'static [TemplateGroup] {
    match band {
        GradeBand::Elementary1 => ELEMENTARY_1,
        GradeBand::Elementary2 => ELEMENTARY_2,
        GradeBand::Intermediate1 => INTERMEDIATE_1,
        GradeBand::Intermediate2 => INTERMEDIATE_2,
        GradeBand::Advanced1 => ADVANCED_1,
        GradeBand::Advanced2 => ADVANCED_2,
    }
}

/// Known-good question used when generation cannot finish. No template
/// renders this prompt, so it never duplicates a generated question.
pub fn fallback_question() -> Question {
    Question {
        prompt: "Choose the correct verb: Every morning, he _____ to school by bus.".to_string(),
        correct_answer: "goes".to_string(),
        incorrect_answers: vec!["go".to_string(), "going".to_string(), "gone".to_string()],
        difficulty: Difficulty::Easy,
        grade: Grade::FIRST,
        hint: "Use 'goes' with he/she/it".to_string(),
        subject: Subject::English,
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

fn missing_instance(group: &TemplateGroup, band: GradeBand) -> QuizError {
    QuizError::NoTemplatesForGrade(format!("{} ({:?} group is empty)", band, group.topic))
}

/// Fill one instance of `group`: the prompt, the correct answer and its
/// distractors.
fn instantiate<R: RandomSource>(
    group: &TemplateGroup,
    band: GradeBand,
    rng: &mut R,
) -> Result<(String, String, Vec<String>), QuizError> {
    match group.shape {
        TemplateShape::SubjectAgreement { lead, subjects, sentences } => {
            let subject = *rng.choose(subjects).ok_or_else(|| missing_instance(group, band))?;
            let sentence = rng.choose(sentences).ok_or_else(|| missing_instance(group, band))?;
            let (correct, other) = if takes_base_form(subject) {
                (sentence.base, sentence.third_person)
            } else {
                (sentence.third_person, sentence.base)
            };
            let mut incorrect = vec![other.to_string()];
            incorrect.extend(strings(sentence.confusables));
            let prompt = format!("{} {}", lead, sentence.pattern.replace("{subject}", subject));
            Ok((prompt, correct.to_string(), incorrect))
        }
        TemplateShape::WordTransformation { prompt, forms } => {
            let form = rng.choose(forms).ok_or_else(|| missing_instance(group, band))?;
            Ok((
                prompt.replace("{word}", form.word),
                form.correct.to_string(),
                strings(form.distractors),
            ))
        }
        TemplateShape::SentenceChoice { lead, sentences } => {
            let sentence = rng.choose(sentences).ok_or_else(|| missing_instance(group, band))?;
            let (correct, incorrect) = sentence
                .options
                .split_first()
                .ok_or_else(|| missing_instance(group, band))?;
            Ok((
                format!("{} {}", lead, sentence.text),
                correct.to_string(),
                strings(incorrect),
            ))
        }
    }
}

/// Grammar question for the grade together with the topic it tests.
pub fn generate_classified<R: RandomSource>(
    grade: Grade,
    rng: &mut R,
) -> Result<(GrammarTopic, Question), QuizError> {
    let band = grade.band();
    let group = rng
        .choose(template_groups(band))
        .ok_or_else(|| QuizError::NoTemplatesForGrade(band.to_string()))?;

    let (prompt, correct_answer, incorrect_answers) = instantiate(group, band, rng)?;
    let question = Question {
        prompt,
        correct_answer,
        incorrect_answers,
        difficulty: grade.difficulty(),
        grade,
        hint: group.hint.to_string(),
        subject: Subject::English,
    };

    // the tables are data, so every instance is checked before it leaves
    if let Err(defect) = validator::check(&question) {
        log_generation!(rejected, subject = Subject::English, grade = grade, reason = defect);
        return Err(QuizError::MalformedQuestion(defect));
    }
    Ok((group.topic, question))
}

pub fn generate<R: RandomSource>(grade: Grade, rng: &mut R) -> Result<Question, QuizError> {
    generate_classified(grade, rng).map(|(_, question)| question)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{RngSource, SequenceSource};

    fn grade(value: i64) -> Grade {
        Grade::new(value).unwrap()
    }

    #[test]
    fn test_subject_agreement_rule() {
        assert!(takes_base_form("They"));
        assert!(takes_base_form("I"));
        assert!(takes_base_form("The girls"));
        assert!(takes_base_form("My friends"));
        assert!(takes_base_form("The children"));
        assert!(!takes_base_form("He"));
        assert!(!takes_base_form("The boy"));
        assert!(!takes_base_form("The cat"));
        assert!(!takes_base_form("The class"));
    }

    #[test]
    fn test_agreement_question_is_computed_from_subject() {
        // group 0, subject index 7 ("The girls"), sentence 0
        let mut rng = SequenceSource::new(vec![0, 7, 0]);
        let (topic, question) = generate_classified(grade(1), &mut rng).unwrap();
        assert_eq!(topic, GrammarTopic::SubjectVerbAgreement);
        assert_eq!(question.prompt, "Choose the correct verb: The girls _____ to school.");
        assert_eq!(question.correct_answer, "go");
        assert_eq!(question.incorrect_answers, vec!["goes", "going", "gone"]);
        assert_eq!(question.difficulty, Difficulty::Easy);
    }

    #[test]
    fn test_plural_lookup() {
        // group 1 (plurals), form 4 ("child")
        let mut rng = SequenceSource::new(vec![1, 4]);
        let question = generate(grade(2), &mut rng).unwrap();
        assert_eq!(question.prompt, "What is the plural form of \"child\"?");
        assert_eq!(question.correct_answer, "children");
        assert!(!question.incorrect_answers.contains(&question.correct_answer));
    }

    #[test]
    fn test_sentence_choice_uses_first_option() {
        let mut rng = SequenceSource::new(vec![0, 0]);
        let question = generate(grade(11), &mut rng).unwrap();
        assert_eq!(
            question.prompt,
            "Choose the correct subjunctive mood: I wish I _____ there to help."
        );
        assert_eq!(question.correct_answer, "were");
        assert_eq!(question.incorrect_answers, vec!["was", "am", "be"]);
        assert_eq!(question.difficulty, Difficulty::Hard);
    }

    #[test]
    fn test_grade_one_topics() {
        let mut rng = RngSource::seeded(21);
        for _ in 0..200 {
            let (topic, _) = generate_classified(grade(1), &mut rng).unwrap();
            assert!(matches!(
                topic,
                GrammarTopic::SubjectVerbAgreement
                    | GrammarTopic::Pluralization
                    | GrammarTopic::ArticleChoice
            ));
        }
    }

    #[test]
    fn test_grade_twelve_topics() {
        let mut rng = RngSource::seeded(22);
        for _ in 0..200 {
            let (topic, _) = generate_classified(grade(12), &mut rng).unwrap();
            assert!(matches!(
                topic,
                GrammarTopic::SubjunctiveMood | GrammarTopic::ParallelStructure
            ));
        }
    }

    #[test]
    fn test_every_template_instance_validates() {
        for g in Grade::all() {
            for group in template_groups(g.band()) {
                let instances = match group.shape {
                    TemplateShape::SubjectAgreement { subjects, sentences, .. } => {
                        subjects.len() * sentences.len()
                    }
                    TemplateShape::WordTransformation { forms, .. } => forms.len(),
                    TemplateShape::SentenceChoice { sentences, .. } => sentences.len(),
                };
                assert!(instances > 0, "{:?} has no instances", group.topic);
            }
        }

        let mut rng = RngSource::seeded(23);
        for g in Grade::all() {
            for _ in 0..100 {
                let question = generate(g, &mut rng).unwrap();
                assert!(validator::validate(&question));
                assert_eq!(question.subject, Subject::English);
            }
        }
    }

    #[test]
    fn test_fallback_question_is_valid() {
        assert!(validator::validate(&fallback_question()));
    }

    fn rendered_prompts(shape: TemplateShape) -> Vec<String> {
        match shape {
            TemplateShape::SubjectAgreement { lead, subjects, sentences } => subjects
                .iter()
                .flat_map(|subject| {
                    sentences.iter().map(move |sentence| {
                        format!("{} {}", lead, sentence.pattern.replace("{subject}", subject))
                    })
                })
                .collect(),
            TemplateShape::WordTransformation { prompt, forms } => forms
                .iter()
                .map(|form| prompt.replace("{word}", form.word))
                .collect(),
            TemplateShape::SentenceChoice { lead, sentences } => sentences
                .iter()
                .map(|sentence| format!("{} {}", lead, sentence.text))
                .collect(),
        }
    }

    #[test]
    fn test_no_template_renders_the_fallback_prompt() {
        let fallback = fallback_question().prompt;
        for g in Grade::all() {
            for group in template_groups(g.band()) {
                assert!(
                    !rendered_prompts(group.shape).contains(&fallback),
                    "{:?} can render the fallback prompt",
                    group.topic
                );
            }
        }
    }
}
