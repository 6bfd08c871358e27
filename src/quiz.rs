mod bank;
mod error;
mod question;
mod session;
mod summary;
mod timer;


pub use bank::{load_bank, save_bank};
pub use error::{QuizError, Result};
pub use question::{Difficulty, ImageInfo, QuestionBank, QuizQuestion};
pub use session::{
    Outcome, Phase, QuestionSlot, QuizSession, Reveal, RevisitPolicy, SubmitTrigger, TickOutcome,
};
pub use summary::{QuestionOutcome, QuizSummary, percent};
pub use timer::{Countdown, Tick, Ticker};
