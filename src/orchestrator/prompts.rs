//! Prompt composition. Everything here is a pure function of its inputs;
//! the debate prompt in particular depends only on the topic and the
//! transcript of strictly-prior rounds.

use crate::models::{QuestionType, Statement};

/// Enhance a Q&A question according to its type hint
pub fn enhance_prompt(question: &str, hint: QuestionType) -> String {
    match hint {
        QuestionType::Coding => format!(
            "You are an expert programmer. Please provide a clear, well-documented \
             solution to the following coding question:\n\n{question}\n\n\
             Please include:\n\
             - Clear explanation of the approach\n\
             - Well-commented code\n\
             - Any important considerations or edge cases\n\n\
             Format your response clearly with sections for explanation and code."
        ),
        QuestionType::General => format!(
            "Please provide a comprehensive and helpful answer to the following \
             question:\n\n{question}\n\n\
             Please be clear, accurate, and provide examples where appropriate."
        ),
    }
}

/// Render the transcript of prior rounds, every statement verbatim
fn render_transcript(transcript: &[Statement]) -> String {
    if transcript.is_empty() {
        return "No statements have been made yet.".to_string();
    }
    let mut out = String::new();
    let mut current_round = 0;
    for statement in transcript {
        if statement.round != current_round {
            current_round = statement.round;
            out.push_str(&format!("ROUND {} STATEMENTS:\n\n", current_round));
        }
        out.push_str(&format!("**{}**:\n{}\n\n", statement.model, statement.content));
    }
    out.trim_end().to_string()
}

/// Build the prompt for one participant in one debate round.
///
/// Round 1 asks for an initial position; later rounds embed the full
/// transcript of all prior rounds so the participant sees the debate so far;
/// the final round asks for a closing argument.
pub fn debate_prompt(
    topic: &str,
    round: u32,
    total_rounds: u32,
    model: &str,
    transcript: &[Statement],
) -> String {
    if round == 1 {
        return format!(
            "You are \"{model}\" participating in a structured debate with other AI models.\n\n\
             TOPIC: {topic}\n\n\
             This is ROUND {round} of {total_rounds}. Present your initial position on this topic.\n\n\
             Requirements:\n\
             - Present a clear, well-reasoned argument\n\
             - Take a specific stance (for, against, or nuanced position)\n\
             - Provide evidence or logical reasoning\n\
             - Be concise but thorough (2-3 paragraphs)\n\
             - Remember your position for future rounds\n\n\
             Your initial argument:"
        );
    }

    let history = render_transcript(transcript);

    if round == total_rounds {
        format!(
            "You are \"{model}\" in the FINAL ROUND ({round} of {total_rounds}) of the debate on: {topic}\n\n\
             DEBATE SO FAR:\n\n{history}\n\n\
             This is your final chance to make your case:\n\
             - Summarize your strongest arguments\n\
             - Address any remaining counterpoints\n\
             - Find common ground where possible\n\
             - Present your final position clearly\n\n\
             Your final argument (2-3 paragraphs):"
        )
    } else {
        format!(
            "You are \"{model}\" in ROUND {round} of {total_rounds} of a debate on: {topic}\n\n\
             DEBATE SO FAR:\n\n{history}\n\n\
             Now respond to the arguments made so far:\n\
             - Address specific points made by other models by name\n\
             - Strengthen your position with new evidence\n\
             - Acknowledge valid points while maintaining your stance\n\
             - Challenge weak arguments respectfully\n\n\
             Your response (2-3 paragraphs):"
        )
    }
}
