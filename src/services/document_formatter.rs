use crate::models::{
    domain::{question::option_label, Document, DocumentType, Question},
    dto::request::OutputFormat,
};

pub const SOLVED_EXAMPLES_TITLE: &str = "Solved Examples";
pub const ASSIGNMENT_TITLE: &str = "Assignment";
pub const QUESTIONS_TITLE: &str = "Questions";
pub const ANSWER_KEY_TITLE: &str = "Answer Key";

const ENTRY_SEPARATOR: &str = "\n\n---\n\n";

pub struct DocumentFormatter;

impl DocumentFormatter {
    /// Turns a question list into the documents for the requested output format.
    pub fn format(questions: &[Question], format: OutputFormat) -> Vec<Document> {
        match format {
            OutputFormat::SolvedExamples => vec![Self::solved_examples(questions)],
            OutputFormat::AssignmentFormat => vec![Self::assignment(questions)],
            OutputFormat::SeparateDocuments => {
                let (questions_doc, answers_doc) = Self::separate(questions);
                vec![questions_doc, answers_doc]
            }
        }
    }

    /// Each question immediately followed by its answer.
    pub fn solved_examples(questions: &[Question]) -> Document {
        let content = questions
            .iter()
            .enumerate()
            .map(|(i, question)| {
                format!(
                    "{}\n\n{}",
                    question_block(i + 1, question),
                    answer_block(i + 1, question)
                )
            })
            .collect::<Vec<_>>()
            .join(ENTRY_SEPARATOR);

        Document::new(SOLVED_EXAMPLES_TITLE, content, DocumentType::Combined)
    }

    /// All questions first, then the answer key.
    pub fn assignment(questions: &[Question]) -> Document {
        let content = format!(
            "# Questions\n\n{}{}# Answer Key\n\n{}",
            questions_section(questions),
            ENTRY_SEPARATOR,
            answers_section(questions)
        );

        Document::new(ASSIGNMENT_TITLE, content, DocumentType::Combined)
    }

    /// A questions-only document and an answers-only document.
    pub fn separate(questions: &[Question]) -> (Document, Document) {
        (
            Document::new(
                QUESTIONS_TITLE,
                questions_section(questions),
                DocumentType::Questions,
            ),
            Document::new(
                ANSWER_KEY_TITLE,
                answers_section(questions),
                DocumentType::Answers,
            ),
        )
    }
}

fn questions_section(questions: &[Question]) -> String {
    questions
        .iter()
        .enumerate()
        .map(|(i, question)| question_block(i + 1, question))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn answers_section(questions: &[Question]) -> String {
    questions
        .iter()
        .enumerate()
        .map(|(i, question)| answer_block(i + 1, question))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn question_block(number: usize, question: &Question) -> String {
    let mut block = format!("**Question {}:** {}", number, question.stem.trim());
    for (index, option) in question.listed_options().iter().enumerate() {
        block.push_str(&format!("\n{}. {}", option_label(index), option.trim()));
    }
    block
}

fn answer_block(number: usize, question: &Question) -> String {
    let mut block = format!("**Answer {}:** {}", number, question.answer.trim());
    if let Some(explanation) = question
        .explanation
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
    {
        block.push_str(&format!("\n**Explanation:** {}", explanation));
    }
    block
}
