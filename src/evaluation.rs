use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::api::{Detector, HumanReview};
use crate::classifier::{Classifier, DetectorSpec, ImagePayload, QueryOptions};
use crate::images::{self, DEFAULT_IMAGE_PATTERN};

pub const PPE_QUERY: &str =
    "Is the person in the image wearing both their hard hat and safety vest properly?";
pub const COURT_QUERY: &str = "Is there at least one person on the basketball court?";

/// Which image set of a target to evaluate.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationSet {
    Original,
    Updated,
}

/// Everything that distinguishes one batch evaluation from another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationTarget {
    pub detector: DetectorSpec,
    #[serde(default)]
    pub human_review: HumanReview,
    pub original_dir: PathBuf,
    pub updated_dir: PathBuf,
    #[serde(default = "default_pattern")]
    pub pattern: String,
}

fn default_pattern() -> String {
    DEFAULT_IMAGE_PATTERN.to_string()
}

impl EvaluationTarget {
    pub fn directory(&self, set: EvaluationSet) -> &Path {
        match set {
            EvaluationSet::Original => &self.original_dir,
            EvaluationSet::Updated => &self.updated_dir,
        }
    }

    pub fn query_options(&self) -> QueryOptions {
        QueryOptions::new(self.detector.confidence_threshold, self.human_review)
    }
}

pub fn ppe_target() -> EvaluationTarget {
    EvaluationTarget {
        detector: DetectorSpec::new("ppe", PPE_QUERY, 0.7),
        human_review: HumanReview::Always,
        original_dir: PathBuf::from("./ppe_images"),
        updated_dir: PathBuf::from("./new_images"),
        pattern: default_pattern(),
    }
}

pub fn court_target() -> EvaluationTarget {
    EvaluationTarget {
        detector: DetectorSpec::new("court", COURT_QUERY, 0.7),
        human_review: HumanReview::Never,
        original_dir: PathBuf::from("./court_images"),
        updated_dir: PathBuf::from("./new_court_images"),
        pattern: default_pattern(),
    }
}

/// Targets available without any config file, keyed by name.
pub fn builtin_targets() -> BTreeMap<String, EvaluationTarget> {
    BTreeMap::from([
        ("ppe".to_string(), ppe_target()),
        ("court".to_string(), court_target()),
    ])
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationSummary {
    pub processed: usize,
    pub failed: usize,
}

/// One pass over a directory of images against a single detector.
pub struct Evaluation<'a> {
    classifier: &'a dyn Classifier,
    detector: &'a Detector,
    options: QueryOptions,
}

impl<'a> Evaluation<'a> {
    pub fn new(classifier: &'a dyn Classifier, detector: &'a Detector, options: QueryOptions) -> Self {
        Self {
            classifier,
            detector,
            options,
        }
    }

    /// Classifies each file in order, reporting to stdout.
    pub fn run(&self, files: &[PathBuf]) -> io::Result<EvaluationSummary> {
        self.report(files, &mut io::stdout().lock())
    }

    /// The processing line is written once the answer is back, directly above
    /// its result line. A failed image is reported and skipped.
    pub fn report<W: Write>(&self, files: &[PathBuf], out: &mut W) -> io::Result<EvaluationSummary> {
        let mut summary = EvaluationSummary::default();
        writeln!(out, "\n")?;

        for path in files {
            let outcome =
                self.classifier
                    .submit(self.detector, ImagePayload::File(path), &self.options);
            writeln!(out, "* Processing image: {} *", path.display())?;
            match outcome {
                Ok(result) => {
                    writeln!(out, "{}", result_line(&result.label.to_string(), result.confidence))?;
                    summary.processed += 1;
                }
                Err(err) => {
                    writeln!(out, "Error submitting image query: {err}")?;
                    log::warn!("Classification failed for {}: {}", path.display(), err);
                    summary.failed += 1;
                }
            }
        }

        log::info!(
            "Evaluation finished: {} processed, {} failed",
            summary.processed,
            summary.failed
        );
        Ok(summary)
    }

    /// Lists the target directory and runs over it.
    pub fn run_directory(&self, dir: &Path, pattern: &str) -> io::Result<EvaluationSummary> {
        let files = images::list_images(dir, pattern)?;
        log::info!(
            "Found {} images matching `{}` in {}",
            files.len(),
            pattern,
            dir.display()
        );
        self.run(&files)
    }
}

/// Prints the confidence exactly as reported; human answers have none.
pub fn result_line(label: &str, confidence: Option<f64>) -> String {
    match confidence {
        Some(confidence) => format!("The answer is {label} | Query confidence = {confidence}"),
        None => format!("The answer is {label} | Query confidence = None"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::classifier::{ClassificationResult, Label};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Shared transcript of classifier calls and report output.
    #[derive(Clone, Default)]
    struct Transcript(Rc<RefCell<String>>);

    impl Write for Transcript {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().push_str(&String::from_utf8_lossy(buf));
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct ScriptedClassifier {
        transcript: Transcript,
        answers: RefCell<Vec<Result<ClassificationResult, ApiError>>>,
    }

    impl Classifier for ScriptedClassifier {
        fn get_or_create_detector(&self, _spec: &DetectorSpec) -> Result<Detector, ApiError> {
            unreachable!("batch runs receive a resolved detector")
        }

        fn submit(
            &self,
            _detector: &Detector,
            image: ImagePayload<'_>,
            _options: &QueryOptions,
        ) -> Result<ClassificationResult, ApiError> {
            if let ImagePayload::File(path) = image {
                self.transcript
                    .0
                    .borrow_mut()
                    .push_str(&format!("[submit {}]\n", path.display()));
            }
            self.answers.borrow_mut().remove(0)
        }
    }

    fn test_detector() -> Detector {
        Detector {
            id: "det_ppe".into(),
            name: "ppe".into(),
            query: PPE_QUERY.into(),
            confidence_threshold: 0.7,
            patience_time: None,
        }
    }

    #[test]
    fn processing_line_follows_the_answer() {
        let transcript = Transcript::default();
        let classifier = ScriptedClassifier {
            transcript: transcript.clone(),
            answers: RefCell::new(vec![
                Ok(ClassificationResult {
                    label: Label::No,
                    confidence: None,
                }),
                Err(ApiError::InvalidImage("truncated".into())),
            ]),
        };
        let detector = test_detector();
        let files = vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg")];

        let summary = Evaluation::new(&classifier, &detector, ppe_target().query_options())
            .report(&files, &mut transcript.clone())
            .unwrap();

        assert_eq!(summary, EvaluationSummary { processed: 1, failed: 1 });
        assert_eq!(
            transcript.0.borrow().as_str(),
            "\n\n\
             [submit a.jpg]\n\
             * Processing image: a.jpg *\n\
             The answer is NO | Query confidence = None\n\
             [submit b.jpg]\n\
             * Processing image: b.jpg *\n\
             Error submitting image query: invalid image: truncated\n"
        );
    }

    #[test]
    fn targets_pick_directory_by_set() {
        let target = ppe_target();
        assert_eq!(target.directory(EvaluationSet::Original), Path::new("./ppe_images"));
        assert_eq!(target.directory(EvaluationSet::Updated), Path::new("./new_images"));
        assert_eq!(target.query_options().human_review, HumanReview::Always);
    }

    #[test]
    fn builtin_targets_differ_in_review_policy() {
        let targets = builtin_targets();
        assert_eq!(targets["ppe"].human_review, HumanReview::Always);
        assert_eq!(targets["court"].human_review, HumanReview::Never);
        assert_eq!(targets["court"].detector.name, "court");
    }

    #[test]
    fn target_deserializes_with_defaults() {
        let json = r#"{
            "detector": {"name": "gloves", "query": "Is the worker wearing gloves?"},
            "original_dir": "./gloves",
            "updated_dir": "./gloves_v2"
        }"#;
        let target: EvaluationTarget = serde_json::from_str(json).unwrap();
        assert_eq!(target.pattern, "*.jpg");
        assert_eq!(target.human_review, HumanReview::Default);
        assert_eq!(target.detector.confidence_threshold, 0.7);
    }

    #[test]
    fn result_line_prints_raw_confidence() {
        assert_eq!(
            result_line("YES", Some(0.82)),
            "The answer is YES | Query confidence = 0.82"
        );
        assert_eq!(
            result_line("NO", None),
            "The answer is NO | Query confidence = None"
        );
    }
}
