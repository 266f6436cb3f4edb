//! Smart quiz sampling.

use crate::error::{ResourceError, ResourceResult};
use crate::resource::{Resource, ResourceContent, ResourceType};
use crate::storage::ResourceStore;
use rand::Rng;

/// Questions tagged with this are kept out of every sample.
pub const EXCLUDED_TAG: &str = "Test";

/// In-place Fisher–Yates shuffle.
pub fn fisher_yates<T, R: Rng>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

fn in_pool(question: &Resource) -> bool {
    if question.tags.iter().any(|t| t == EXCLUDED_TAG) {
        return false;
    }
    match &question.content {
        ResourceContent::Question(body) => body.has_current_state(),
        _ => false,
    }
}

/// Draw up to `numQuestions` authored questions at random for `quiz`.
///
/// The pool is read fresh on every call; the quiz's own `children` list is
/// ignored. Nothing is written.
pub async fn sample_questions<R: Rng + Send>(
    store: &dyn ResourceStore,
    quiz: &Resource,
    rng: &mut R,
) -> ResourceResult<Vec<Resource>> {
    let ResourceContent::SmartQuiz(config) = &quiz.content else {
        return Err(ResourceError::validation(format!(
            "Resource {} is not a smart quiz",
            quiz.id
        )));
    };

    let mut pool: Vec<Resource> = store
        .get_by_type(ResourceType::QuizQuestion)
        .await?
        .into_iter()
        .filter(in_pool)
        .collect();
    fisher_yates(&mut pool, rng);
    pool.truncate(config.num_questions as usize);
    tracing::debug!(quiz = %quiz.id, drawn = pool.len(), "sampled smart quiz");
    Ok(pool)
}
