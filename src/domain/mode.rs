use std::fmt;

/// Which pass a step belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    Eval,
}

impl Mode {
    /// Name the step loss is reported under.
    pub fn loss_name(self) -> &'static str {
        match self {
            Mode::Train => "train_loss",
            Mode::Eval => "val_loss",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Train => f.write_str("training"),
            Mode::Eval => f.write_str("evaluation"),
        }
    }
}
