//! The two-step "name, then quote" submission form.

use std::collections::{HashSet, VecDeque};

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    backend::{BackendError, QuoteBackend},
    constants::{RECENT_DRAFTS, SUBMIT_FAILED_MESSAGE},
    models::quotes::{Limits, NewQuote, Quote, QuoteDraft, ValidationError},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    CollectingName,
    CollectingQuote,
    Submitting,
    Succeeded,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("a submission is already in flight")]
    InFlight,

    #[error("this quote was already shared")]
    AlreadyShared,
}

/// Notifications for whoever hosts the form.
pub trait SubmissionListener: Send + Sync {
    /// The backend accepted the quote.
    fn quote_added(&self, _quote: &Quote) {}

    /// The user dismissed the confirmation and wants to see the wall.
    fn successful_submit(&self) {}
}

impl SubmissionListener for () {}

#[derive(Clone, Debug)]
pub struct SubmissionFlow {
    limits: Limits,
    /// Identifies one quote-step form across repeated posts.
    draft_id: Uuid,
    draft: QuoteDraft,
    step: Step,
    error: Option<String>,
}

impl SubmissionFlow {
    pub fn new(limits: Limits) -> Self {
        SubmissionFlow {
            limits,
            draft_id: Uuid::new_v4(),
            draft: QuoteDraft::default(),
            step: Step::CollectingName,
            error: None,
        }
    }

    /// Rebuilds a flow at `step` from previously entered values.
    pub fn resume(limits: Limits, step: Step, full_name: &str, quote: &str) -> Self {
        let mut flow = SubmissionFlow::new(limits);
        flow.set_full_name(full_name);
        flow.set_quote(quote);
        flow.step = match step {
            Step::CollectingQuote | Step::Submitting if flow.draft.has_name() => step,
            Step::Succeeded => Step::Succeeded,
            _ => Step::CollectingName,
        };

        flow
    }

    pub fn with_draft_id(mut self, draft_id: Uuid) -> Self {
        self.draft_id = draft_id;
        self
    }

    pub fn draft_id(&self) -> Uuid {
        self.draft_id
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn draft(&self) -> &QuoteDraft {
        &self.draft
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// The last human-readable failure, cleared by the next submission.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.step == Step::Submitting
    }

    pub fn set_full_name(&mut self, value: &str) {
        self.draft.set_full_name(value, &self.limits);
    }

    pub fn set_quote(&mut self, value: &str) {
        self.draft.set_quote(value, &self.limits);
    }

    /// Moves from the name step to the quote step.
    pub fn advance(&mut self) -> Result<(), ValidationError> {
        if self.step != Step::CollectingName {
            return Ok(());
        }

        if !self.draft.has_name() {
            return Err(ValidationError::EmptyName);
        }

        self.step = Step::CollectingQuote;
        Ok(())
    }

    /// Returns to the name step, keeping both fields.
    pub fn back(&mut self) {
        if self.step == Step::CollectingQuote {
            self.step = Step::CollectingName;
        }
    }

    #[tracing::instrument(skip_all)]
    pub async fn submit(
        &mut self,
        backend: &dyn QuoteBackend,
        listener: &dyn SubmissionListener,
    ) -> Result<Quote, SubmitError> {
        match self.step {
            Step::Submitting => return Err(SubmitError::InFlight),
            Step::Succeeded => return Err(SubmitError::AlreadyShared),
            Step::CollectingName => self.advance()?,
            Step::CollectingQuote => {}
        }

        let new_quote = NewQuote::from_draft(&self.draft, &self.limits)?;

        self.step = Step::Submitting;
        self.error = None;

        match backend.insert(new_quote).await {
            Ok(quote) => {
                self.step = Step::Succeeded;
                listener.quote_added(&quote);

                Ok(quote)
            }
            Err(e) => {
                tracing::error!(err = ?e, "an error occurred when submitting quote");
                self.step = Step::CollectingQuote;
                self.error = Some(SUBMIT_FAILED_MESSAGE.to_string());

                Err(e.into())
            }
        }
    }

    /// Dismisses the confirmation.
    pub fn view_wall(&mut self, listener: &dyn SubmissionListener) {
        if self.step == Step::Succeeded {
            listener.successful_submit();
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Claim {
    /// Nobody has submitted this draft yet; the caller must [`DraftLedger::release`] it.
    Fresh,
    InFlight,
    Shared,
}

#[derive(Default)]
struct Drafts {
    in_flight: HashSet<Uuid>,
    shared: HashSet<Uuid>,
    shared_order: VecDeque<Uuid>,
}

/// Which drafts are being or have been shared, across every request.
#[derive(Default)]
pub struct DraftLedger {
    drafts: Mutex<Drafts>,
}

impl DraftLedger {
    pub async fn claim(&self, draft_id: Uuid) -> Claim {
        let mut drafts = self.drafts.lock().await;

        if drafts.shared.contains(&draft_id) {
            Claim::Shared
        } else if !drafts.in_flight.insert(draft_id) {
            Claim::InFlight
        } else {
            Claim::Fresh
        }
    }

    /// A failed draft can be claimed again for a retry.
    pub async fn release(&self, draft_id: Uuid, shared: bool) {
        let mut drafts = self.drafts.lock().await;
        drafts.in_flight.remove(&draft_id);

        if shared && drafts.shared.insert(draft_id) {
            drafts.shared_order.push_back(draft_id);

            while drafts.shared_order.len() > RECENT_DRAFTS {
                if let Some(oldest) = drafts.shared_order.pop_front() {
                    drafts.shared.remove(&oldest);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    use async_trait::async_trait;

    use super::*;
    use crate::backend::{
        sqlite::tests::{memory_backend, next_matching},
        Subscription,
    };

    #[derive(Default)]
    struct CountingBackend {
        inserts: AtomicUsize,
        fail_with: Mutex<Option<BackendError>>,
    }

    #[async_trait]
    impl QuoteBackend for CountingBackend {
        async fn insert(&self, quote: NewQuote) -> Result<Quote, BackendError> {
            self.inserts.fetch_add(1, Ordering::SeqCst);

            if let Some(e) = self.fail_with.lock().unwrap().take() {
                return Err(e);
            }

            Ok(Quote {
                id: uuid::Uuid::new_v4(),
                full_name: quote.full_name().to_string(),
                quote: quote.quote().to_string(),
                created_at: time::OffsetDateTime::now_utc(),
            })
        }

        async fn subscribe_all(&self) -> Result<Subscription, BackendError> {
            Err(BackendError::Connectivity("not used".into()))
        }
    }

    #[derive(Default)]
    struct Recorder {
        added: AtomicUsize,
        viewed: AtomicUsize,
    }

    impl SubmissionListener for Recorder {
        fn quote_added(&self, _quote: &Quote) {
            self.added.fetch_add(1, Ordering::SeqCst);
        }

        fn successful_submit(&self) {
            self.viewed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn blank_name_never_reaches_the_backend() {
        let backend = CountingBackend::default();
        let mut flow = SubmissionFlow::new(Limits::default());

        flow.set_full_name("   ");
        assert_eq!(flow.advance(), Err(ValidationError::EmptyName));
        assert_eq!(flow.step(), Step::CollectingName);

        flow.set_quote("Hello");
        let result = flow.submit(&backend, &()).await;

        assert!(matches!(
            result,
            Err(SubmitError::Validation(ValidationError::EmptyName))
        ));
        assert_eq!(flow.step(), Step::CollectingName);
        assert_eq!(backend.inserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blank_quote_blocks_share() {
        let backend = CountingBackend::default();
        let mut flow = SubmissionFlow::new(Limits::default());

        flow.set_full_name("Jane");
        flow.advance().unwrap();
        flow.set_quote(" \n");

        let result = flow.submit(&backend, &()).await;

        assert!(matches!(
            result,
            Err(SubmitError::Validation(ValidationError::EmptyQuote))
        ));
        assert_eq!(flow.step(), Step::CollectingQuote);
        assert_eq!(backend.inserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn back_keeps_both_fields() {
        let mut flow = SubmissionFlow::new(Limits::default());

        flow.set_full_name("Jane");
        flow.advance().unwrap();
        flow.set_quote("Hello");
        flow.back();

        assert_eq!(flow.step(), Step::CollectingName);
        assert_eq!(flow.draft().full_name(), "Jane");
        assert_eq!(flow.draft().quote(), "Hello");
    }

    #[tokio::test]
    async fn over_length_quote_is_cut_before_insert() {
        let backend = CountingBackend::default();
        let limits = Limits {
            name_max: 100,
            quote_max: 400,
        };
        let mut flow = SubmissionFlow::new(limits);

        flow.set_full_name("Jane");
        flow.advance().unwrap();
        flow.set_quote(&"x".repeat(1_000));

        let quote = flow.submit(&backend, &()).await.unwrap();
        assert_eq!(quote.quote.chars().count(), 400);
    }

    #[tokio::test]
    async fn failure_returns_to_quote_step_with_message() {
        let backend = CountingBackend::default();
        *backend.fail_with.lock().unwrap() = Some(BackendError::Write("denied".into()));
        let recorder = Recorder::default();
        let mut flow = SubmissionFlow::new(Limits::default());

        flow.set_full_name("Jane");
        flow.advance().unwrap();
        flow.set_quote("Hello");

        let result = flow.submit(&backend, &recorder).await;
        assert!(matches!(result, Err(SubmitError::Backend(BackendError::Write(_)))));
        assert_eq!(flow.step(), Step::CollectingQuote);
        assert_eq!(flow.error(), Some(SUBMIT_FAILED_MESSAGE));
        assert_eq!(flow.draft().full_name(), "Jane");
        assert_eq!(recorder.added.load(Ordering::SeqCst), 0);

        // retrying is a new explicit action
        flow.submit(&backend, &recorder).await.unwrap();
        assert_eq!(flow.step(), Step::Succeeded);
        assert_eq!(flow.error(), None);
        assert_eq!(backend.inserts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn success_notifies_and_switches_to_wall() {
        let backend = memory_backend().await;
        let mut subscription = backend.subscribe_all().await.unwrap();
        let recorder = Recorder::default();
        let mut flow = SubmissionFlow::new(Limits::default());

        flow.set_full_name("Jane Doe");
        flow.advance().unwrap();
        flow.set_quote("Hello world");

        let quote = flow.submit(&backend, &recorder).await.unwrap();
        assert_eq!(flow.step(), Step::Succeeded);
        assert_eq!(recorder.added.load(Ordering::SeqCst), 1);

        flow.view_wall(&recorder);
        assert_eq!(recorder.viewed.load(Ordering::SeqCst), 1);

        let snapshot = next_matching(&mut subscription, |d| matches!(d, Ok(s) if s.len() == 1))
            .await
            .unwrap();
        assert_eq!(snapshot[0].id, quote.id);
        assert_eq!(snapshot[0].full_name, "Jane Doe");
        assert_eq!(snapshot[0].quote, "Hello world");
    }

    #[tokio::test]
    async fn succeeded_flow_is_not_shared_again() {
        let backend = CountingBackend::default();
        let mut flow = SubmissionFlow::resume(Limits::default(), Step::Succeeded, "Jane", "Hello");

        let result = flow.submit(&backend, &()).await;

        assert!(matches!(result, Err(SubmitError::AlreadyShared)));
        assert_eq!(flow.step(), Step::Succeeded);
        assert_eq!(backend.inserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn drafts_are_claimed_once() {
        let ledger = DraftLedger::default();
        let draft = Uuid::new_v4();

        assert_eq!(ledger.claim(draft).await, Claim::Fresh);
        assert_eq!(ledger.claim(draft).await, Claim::InFlight);

        ledger.release(draft, false).await;
        assert_eq!(ledger.claim(draft).await, Claim::Fresh);

        ledger.release(draft, true).await;
        assert_eq!(ledger.claim(draft).await, Claim::Shared);
    }

    #[tokio::test]
    async fn only_recent_drafts_are_remembered() {
        let ledger = DraftLedger::default();
        let first = Uuid::new_v4();

        ledger.claim(first).await;
        ledger.release(first, true).await;
        for _ in 0..RECENT_DRAFTS {
            let draft = Uuid::new_v4();
            ledger.claim(draft).await;
            ledger.release(draft, true).await;
        }

        assert_eq!(ledger.claim(first).await, Claim::Fresh);
    }

    #[test]
    fn resume_without_name_starts_over() {
        let flow = SubmissionFlow::resume(Limits::default(), Step::CollectingQuote, " ", "Hi");

        assert_eq!(flow.step(), Step::CollectingName);
        assert_eq!(flow.draft().quote(), "Hi");
    }
}
