//! Drives a two-party debate: the first participant answers the seed, then
//! the two trade replies for a fixed number of rounds.

use log::{debug, info};

use super::{History, Message, Seat, Transcript, Utterance};
use crate::participant::Participant;

pub struct Debate<'a> {
    first: &'a Participant,
    second: &'a Participant,
    max_history_messages: usize,
}

impl<'a> Debate<'a> {
    pub fn new(
        first: &'a Participant,
        second: &'a Participant,
        max_history_messages: usize,
    ) -> Self {
        Self {
            first,
            second,
            max_history_messages,
        }
    }

    /// Runs one seeded exchange of `1 + 2 * rounds` replies. Each reply is
    /// handed to `on_utterance` before the next request is issued.
    ///
    /// Both histories are appended to and never truncated; they may already
    /// hold earlier exchanges from the same session.
    pub async fn run<F>(
        &self,
        seed: &str,
        rounds: u32,
        first_history: &mut History,
        second_history: &mut History,
        mut on_utterance: F,
    ) -> Transcript
    where
        F: FnMut(&Utterance),
    {
        info!(
            "Starting debate: {} vs {} ({} rounds)",
            self.first.name, self.second.name, rounds
        );

        let mut transcript = Transcript::new(seed);

        first_history.push(Message::user(seed));
        let mut last_first = self
            .take_turn(Seat::First, first_history, &mut transcript, &mut on_utterance)
            .await;

        for round in 1..=rounds {
            debug!("Round {round}/{rounds}");

            second_history.push(Message::user(last_first));
            let reply = self
                .take_turn(Seat::Second, second_history, &mut transcript, &mut on_utterance)
                .await;

            first_history.push(Message::user(reply));
            last_first = self
                .take_turn(Seat::First, first_history, &mut transcript, &mut on_utterance)
                .await;
        }

        info!("Debate finished with {} replies", transcript.utterances.len());
        transcript
    }

    async fn take_turn<F>(
        &self,
        seat: Seat,
        history: &mut History,
        transcript: &mut Transcript,
        on_utterance: &mut F,
    ) -> String
    where
        F: FnMut(&Utterance),
    {
        let participant = match seat {
            Seat::First => self.first,
            Seat::Second => self.second,
        };

        let reply = participant
            .respond(history.window(self.max_history_messages))
            .await;
        history.push(Message::assistant(reply.clone()));

        let utterance = Utterance {
            seat,
            speaker: participant.name.clone(),
            words: reply.clone(),
        };
        on_utterance(&utterance);
        transcript.utterances.push(utterance);

        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;
    use crate::participant::echo::EchoClient;
    use crate::participant::tests::{Failing, Recorder, SAMPLING};
    use std::sync::Arc;

    const SEED: &str = "Is pineapple on pizza acceptable?";

    fn echo(name: &str) -> Participant {
        Participant::new(
            name,
            "echo",
            format!("You are {name}."),
            SAMPLING,
            Some(Box::new(EchoClient::new(name))),
        )
    }

    fn assert_alternates(history: &History) {
        for (index, message) in history.messages().iter().enumerate() {
            let expected = if index % 2 == 0 { Role::User } else { Role::Assistant };
            assert_eq!(message.role, expected, "message {index} out of order");
        }
    }

    #[tokio::test]
    async fn test_pineapple_echo_scenario() {
        let (a, b) = (echo("A"), echo("B"));
        let (mut history_a, mut history_b) = (History::new(), History::new());
        let mut emitted = Vec::new();

        let transcript = Debate::new(&a, &b, 0)
            .run(SEED, 1, &mut history_a, &mut history_b, |utterance| {
                emitted.push((utterance.speaker.clone(), utterance.words.clone()))
            })
            .await;

        assert_eq!(
            emitted,
            vec![
                ("A".to_string(), format!("@A: {SEED}")),
                ("B".to_string(), format!("@B: @A: {SEED}")),
                ("A".to_string(), format!("@A: @B: @A: {SEED}")),
            ]
        );
        assert_eq!(transcript.seed, SEED);
        assert_eq!(transcript.utterances.len(), 3);
        assert_eq!(history_a.len(), 4);
        assert_eq!(history_b.len(), 2);
        assert_eq!(history_b.messages()[0], Message::user(format!("@A: {SEED}")));
    }

    #[tokio::test]
    async fn test_counts_and_alternation_for_several_rounds() {
        let (a, b) = (echo("A"), echo("B"));

        for rounds in 1..=5u32 {
            let (mut history_a, mut history_b) = (History::new(), History::new());
            let transcript = Debate::new(&a, &b, 0)
                .run("topic", rounds, &mut history_a, &mut history_b, |_| {})
                .await;

            let expected = 1 + 2 * rounds as usize;
            assert_eq!(transcript.utterances.len(), expected);
            for (index, utterance) in transcript.utterances.iter().enumerate() {
                let seat = if index % 2 == 0 { Seat::First } else { Seat::Second };
                assert_eq!(utterance.seat, seat);
                assert!(!utterance.words.is_empty());
            }
            assert_eq!(history_a.len(), 2 + 2 * rounds as usize);
            assert_eq!(history_b.len(), 2 * rounds as usize);
            assert_alternates(&history_a);
            assert_alternates(&history_b);
        }
    }

    #[tokio::test]
    async fn test_zero_rounds_is_initial_exchange_only() {
        let (a, b) = (echo("A"), echo("B"));
        let (mut history_a, mut history_b) = (History::new(), History::new());

        let transcript = Debate::new(&a, &b, 0)
            .run(SEED, 0, &mut history_a, &mut history_b, |_| {})
            .await;

        assert_eq!(transcript.utterances.len(), 1);
        assert_eq!(transcript.utterances[0].seat, Seat::First);
        assert_eq!(history_a.len(), 2);
        assert_eq!(history_b.len(), 0);
    }

    #[tokio::test]
    async fn test_unconfigured_first_feeds_error_to_second() {
        let a = Participant::new("A", "gpt-4o-mini", "Argue.", SAMPLING, None);
        let b = echo("B");
        let (mut history_a, mut history_b) = (History::new(), History::new());

        let transcript = Debate::new(&a, &b, 0)
            .run(SEED, 1, &mut history_a, &mut history_b, |_| {})
            .await;

        let first = &transcript.utterances[0];
        assert_eq!(first.seat, Seat::First);
        assert!(first.words.starts_with("Error: A is not configured"));
        assert_eq!(history_b.messages()[0], Message::user(first.words.clone()));
    }

    #[tokio::test]
    async fn test_missing_second_credentials_still_completes() {
        let a = echo("A");
        let b = Participant::new("B", "gemini-1.5-flash", "Be polite.", SAMPLING, None);
        let (mut history_a, mut history_b) = (History::new(), History::new());

        let transcript = Debate::new(&a, &b, 0)
            .run(SEED, 1, &mut history_a, &mut history_b, |_| {})
            .await;

        assert_eq!(transcript.utterances.len(), 3);
        assert!(transcript.utterances[1].words.starts_with("Error: B is not configured"));
        assert_eq!(history_a.len(), 4);
    }

    #[tokio::test]
    async fn test_failed_call_does_not_halt_the_run() {
        let a = echo("A");
        let b = Participant::new("B", "model", "x", SAMPLING, Some(Box::new(Failing)));
        let (mut history_a, mut history_b) = (History::new(), History::new());

        let transcript = Debate::new(&a, &b, 0)
            .run(SEED, 2, &mut history_a, &mut history_b, |_| {})
            .await;

        assert_eq!(transcript.utterances.len(), 5);
        assert_eq!(
            transcript.utterances[2].words,
            "@A: Error calling B: quota exceeded"
        );
    }

    #[tokio::test]
    async fn test_requests_are_windowed_but_history_is_kept() {
        let recorder = Arc::new(Recorder::default());
        let a = Participant::new("A", "m", "Argue.", SAMPLING, Some(Box::new(recorder.clone())));
        let b = echo("B");
        let (mut history_a, mut history_b) = (History::new(), History::new());

        Debate::new(&a, &b, 3)
            .run(SEED, 3, &mut history_a, &mut history_b, |_| {})
            .await;

        assert_eq!(history_a.len(), 8);
        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 4);
        for (_, sent) in seen.iter() {
            assert!(sent.len() <= 3);
            assert_eq!(sent[0].role, Role::User);
        }
        assert_eq!(seen[0].1, vec![Message::user(SEED)]);
    }

    #[tokio::test]
    async fn test_histories_carry_over_between_runs() {
        let (a, b) = (echo("A"), echo("B"));
        let (mut history_a, mut history_b) = (History::new(), History::new());
        let debate = Debate::new(&a, &b, 0);

        debate.run("one", 1, &mut history_a, &mut history_b, |_| {}).await;
        debate.run("two", 1, &mut history_a, &mut history_b, |_| {}).await;

        assert_eq!(history_a.len(), 8);
        assert_eq!(history_b.len(), 4);
        assert_alternates(&history_a);
        assert_alternates(&history_b);
    }
}
