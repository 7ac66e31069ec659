//! Confirmation seam for destructive edits
//!
//! The editor asks before an edit that may silently break pin connections.
//! Front ends plug in whatever dialog they have; batch tools use [`AutoConfirm`].

/// What the user is being asked to approve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmRequest {
    pub title: String,
    pub message: String,
    /// Number of nodes the edit will reconstruct
    pub affected_nodes: usize,
}

pub trait ConfirmationPrompt {
    /// Returns true to proceed
    fn confirm(&mut self, request: &ConfirmRequest) -> bool;
}

/// Answers every request the same way
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl ConfirmationPrompt for AutoConfirm {
    fn confirm(&mut self, request: &ConfirmRequest) -> bool {
        tracing::debug!(title = %request.title, answer = self.0, "auto-answering confirmation");
        self.0
    }
}

impl<P: ConfirmationPrompt + ?Sized> ConfirmationPrompt for Box<P> {
    fn confirm(&mut self, request: &ConfirmRequest) -> bool {
        (**self).confirm(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boxed_prompt_forwards() {
        let mut prompt: Box<dyn ConfirmationPrompt> = Box::new(AutoConfirm(false));
        let request = ConfirmRequest {
            title: "Change type".into(),
            message: "Nodes will be reconstructed".into(),
            affected_nodes: 2,
        };
        assert!(!prompt.confirm(&request));
    }
}
