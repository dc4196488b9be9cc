//! Submitted code: an uploaded file or pasted text.

use crate::error::TutorError;

#[derive(Debug, Clone, Default)]
pub struct Submission {
    /// Raw bytes of the uploaded file, if a file was chosen.
    pub upload: Option<Vec<u8>>,
    pub pasted: Option<String>,
    pub voice: Option<String>,
}

impl Submission {
    /// The code to explain. An upload takes priority over pasted text;
    /// with neither, the result is empty.
    pub fn extract_code(&self) -> Result<String, TutorError> {
        if let Some(bytes) = &self.upload {
            return Ok(String::from_utf8(bytes.clone())?);
        }
        Ok(self.pasted.clone().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_beats_pasted_text() {
        let submission = Submission {
            upload: Some(b"fn main() {}".to_vec()),
            pasted: Some("print('hi')".into()),
            voice: None,
        };
        assert_eq!(submission.extract_code().unwrap(), "fn main() {}");
    }

    #[test]
    fn pasted_text_alone() {
        let submission = Submission {
            pasted: Some("print('hi')".into()),
            ..Default::default()
        };
        assert_eq!(submission.extract_code().unwrap(), "print('hi')");
    }

    #[test]
    fn nothing_submitted_is_empty() {
        assert_eq!(Submission::default().extract_code().unwrap(), "");
    }

    #[test]
    fn upload_must_be_utf8() {
        let submission = Submission {
            upload: Some(vec![0xC3, 0x28]),
            pasted: Some("ignored".into()),
            voice: None,
        };
        assert!(matches!(
            submission.extract_code(),
            Err(TutorError::InvalidUpload(_))
        ));
    }
}
