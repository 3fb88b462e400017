//! Persistence: write the final cards as CSV, JSON and tab-separated text.
//!
//! Files are named `flashcards_<subject>.{csv,json,txt}` inside the output
//! directory and are overwritten on every request for the same subject. Each
//! file is written to a `.tmp` sibling and renamed into place, so a reader
//! never sees a half-written artifact.

use crate::error::FlashcardError;
use crate::output::{Flashcard, SavedArtifacts};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Write all three artifacts for `subject` into `dir`.
///
/// The directory is created if missing. Any failure aborts the request.
pub async fn save_flashcards(
    cards: &[Flashcard],
    subject: &str,
    dir: impl AsRef<Path>,
) -> Result<SavedArtifacts, FlashcardError> {
    validate_subject(subject)?;
    let dir = dir.as_ref();

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| FlashcardError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

    let artifacts = artifact_paths(dir, subject);

    let csv = render_csv(cards).map_err(|detail| FlashcardError::OutputEncodeFailed {
        path: artifacts.csv.clone(),
        detail,
    })?;
    let json = render_json(cards).map_err(|detail| FlashcardError::OutputEncodeFailed {
        path: artifacts.json.clone(),
        detail,
    })?;
    let txt = render_txt(cards);

    write_atomic(&artifacts.csv, csv.as_bytes()).await?;
    write_atomic(&artifacts.json, json.as_bytes()).await?;
    write_atomic(&artifacts.txt, txt.as_bytes()).await?;

    info!(
        "Saved {} flashcards for '{}' to {}",
        cards.len(),
        subject,
        dir.display()
    );
    Ok(artifacts)
}

/// The three output paths for `subject` under `dir`.
pub fn artifact_paths(dir: &Path, subject: &str) -> SavedArtifacts {
    SavedArtifacts {
        csv: dir.join(format!("flashcards_{subject}.csv")),
        json: dir.join(format!("flashcards_{subject}.json")),
        txt: dir.join(format!("flashcards_{subject}.txt")),
    }
}

/// Resolve a previously written artifact by file name.
///
/// Only plain file names are accepted; anything that could reach outside
/// `dir` is reported as not found.
pub fn artifact_path(dir: impl AsRef<Path>, file_name: &str) -> Result<PathBuf, FlashcardError> {
    let not_found = || FlashcardError::ArtifactNotFound {
        file_name: file_name.to_string(),
    };

    if !is_plain_segment(file_name) {
        return Err(not_found());
    }

    let path = dir.as_ref().join(file_name);
    if path.is_file() {
        Ok(path)
    } else {
        Err(not_found())
    }
}

/// Reject subjects that would escape the output directory.
pub fn validate_subject(subject: &str) -> Result<(), FlashcardError> {
    if is_plain_segment(subject) {
        Ok(())
    } else {
        Err(FlashcardError::InvalidSubject {
            subject: subject.to_string(),
        })
    }
}

fn is_plain_segment(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// CSV with a `question,answer,topic,difficulty` header row.
pub fn render_csv(cards: &[Flashcard]) -> Result<String, String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer
        .write_record(["question", "answer", "topic", "difficulty"])
        .map_err(|e| e.to_string())?;
    for card in cards {
        writer
            .write_record([
                card.question.as_str(),
                card.answer.as_str(),
                card.topic.as_str(),
                card.difficulty.as_str(),
            ])
            .map_err(|e| e.to_string())?;
    }
    let bytes = writer.into_inner().map_err(|e| e.to_string())?;
    String::from_utf8(bytes).map_err(|e| e.to_string())
}

/// Pretty-printed JSON array of card objects.
pub fn render_json(cards: &[Flashcard]) -> Result<String, String> {
    serde_json::to_string_pretty(cards).map_err(|e| e.to_string())
}

/// One `question<TAB>answer` line per card; topic and difficulty are omitted.
pub fn render_txt(cards: &[Flashcard]) -> String {
    cards
        .iter()
        .map(|c| format!("{}\t{}\n", single_line(&c.question), single_line(&c.answer)))
        .collect()
}

/// Line breaks and tabs inside a field would split a record.
fn single_line(field: &str) -> String {
    field.replace("\r\n", " ").replace(['\r', '\n', '\t'], " ")
}

async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), FlashcardError> {
    let write_err = |source| FlashcardError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, contents).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    debug!("Wrote {} ({} bytes)", path.display(), contents.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Difficulty;

    fn two_cards() -> Vec<Flashcard> {
        vec![
            Flashcard::new("What is H2O?", "Water", "Chemistry", Difficulty::Easy),
            Flashcard::new("Define pH, briefly", "Acidity \"scale\"", "Chemistry", Difficulty::Hard),
        ]
    }

    #[test]
    fn csv_has_header_and_one_row_per_card() {
        let csv = render_csv(&two_cards()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "question,answer,topic,difficulty");
        assert_eq!(lines[1], "What is H2O?,Water,Chemistry,Easy");
        assert_eq!(lines[2], "\"Define pH, briefly\",\"Acidity \"\"scale\"\"\",Chemistry,Hard");
    }

    #[test]
    fn csv_of_no_cards_is_header_only() {
        assert_eq!(render_csv(&[]).unwrap(), "question,answer,topic,difficulty\n");
    }

    #[test]
    fn json_round_trips_as_list_of_objects() {
        let json = render_json(&two_cards()).unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["question"], "What is H2O?");
        assert_eq!(parsed[1]["difficulty"], "Hard");
        assert!(json.contains("\n  {"), "expected indented output: {json}");
    }

    #[test]
    fn na_difficulty_written_as_label() {
        let cards = vec![Flashcard::sentinel("S", "Model error: x")];
        assert!(render_csv(&cards).unwrap().contains(",S,N/A"));
        assert!(render_json(&cards).unwrap().contains("\"N/A\""));
    }

    #[test]
    fn txt_is_tab_separated_question_answer() {
        let txt = render_txt(&two_cards());
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "What is H2O?\tWater");
        assert!(!txt.contains("Chemistry"));
    }

    #[test]
    fn txt_keeps_multi_line_answers_on_one_line() {
        let cards = vec![
            Flashcard::new("List two gases", "Oxygen\nNitrogen", "Air", Difficulty::Easy),
            Flashcard::new("Q2\tpart", "A2\r\nmore", "Air", Difficulty::Easy),
        ];
        let txt = render_txt(&cards);
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "List two gases\tOxygen Nitrogen");
        assert_eq!(lines[1], "Q2 part\tA2 more");
    }

    #[test]
    fn subject_validation() {
        assert!(validate_subject("Biology 101").is_ok());
        assert!(validate_subject("../etc").is_err());
        assert!(validate_subject("a/b").is_err());
        assert!(validate_subject("a\\b").is_err());
        assert!(validate_subject("..").is_err());
        assert!(validate_subject("").is_err());
    }

    #[test]
    fn artifact_names_follow_subject() {
        let paths = artifact_paths(Path::new("out"), "Math");
        assert_eq!(paths.csv, Path::new("out/flashcards_Math.csv"));
        assert_eq!(paths.json, Path::new("out/flashcards_Math.json"));
        assert_eq!(paths.txt, Path::new("out/flashcards_Math.txt"));
    }

    #[tokio::test]
    async fn save_writes_three_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/output");
        let saved = save_flashcards(&two_cards(), "Chemistry", &out).await.unwrap();

        let csv = std::fs::read_to_string(&saved.csv).unwrap();
        assert_eq!(csv.lines().count(), 3);
        let json: Vec<Flashcard> =
            serde_json::from_str(&std::fs::read_to_string(&saved.json).unwrap()).unwrap();
        assert_eq!(json, two_cards());
        let txt = std::fs::read_to_string(&saved.txt).unwrap();
        assert_eq!(txt.lines().filter(|l| l.contains('\t')).count(), 2);

        let leftovers: Vec<_> = std::fs::read_dir(&out)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn save_overwrites_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        save_flashcards(&two_cards(), "S", dir.path()).await.unwrap();
        let saved = save_flashcards(&two_cards()[..1], "S", dir.path()).await.unwrap();
        assert_eq!(std::fs::read_to_string(&saved.txt).unwrap().lines().count(), 1);
    }

    #[tokio::test]
    async fn save_rejects_unsafe_subject_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let err = save_flashcards(&two_cards(), "../escape", dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, FlashcardError::InvalidSubject { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn save_into_unwritable_location_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, b"file").unwrap();
        let err = save_flashcards(&two_cards(), "S", &blocker).await.unwrap_err();
        assert!(matches!(err, FlashcardError::OutputWriteFailed { .. }));
    }

    #[tokio::test]
    async fn artifact_lookup() {
        let dir = tempfile::tempdir().unwrap();
        save_flashcards(&two_cards(), "Chem", dir.path()).await.unwrap();

        let p = artifact_path(dir.path(), "flashcards_Chem.json").unwrap();
        assert!(p.ends_with("flashcards_Chem.json"));
        assert!(matches!(
            artifact_path(dir.path(), "flashcards_Missing.csv"),
            Err(FlashcardError::ArtifactNotFound { .. })
        ));
        assert!(artifact_path(dir.path(), "../flashcards_Chem.json").is_err());
    }
}
