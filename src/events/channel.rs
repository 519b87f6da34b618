//! Progress transport between the inspection core and its front end.
//!
//! Scoring and region comparison run on rayon workers; every worker holds a
//! clone of the [`EventSender`] and the CLI drains the [`EventReceiver`] on its
//! own thread to drive spinners and progress bars.

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::Event;

/// Handle the pipeline reports through
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    /// Report `event`. Never blocks; dropped once nobody listens.
    pub fn send(&self, event: Event) {
        let _ = self.inner.send(event);
    }
}

/// Front-end end of an inspection's event stream
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Next event, or `None` once every sender is gone
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    /// Events in arrival order; ends when the inspection drops its senders
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

pub struct EventChannel;

impl EventChannel {
    /// Sender for the pipeline, receiver for the front end.
    ///
    /// The channel is unbounded, so `send` never waits on a slow terminal.
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }
}

/// Sender for library callers that do not watch progress
pub fn null_sender() -> EventSender {
    let (sender, _receiver) = EventChannel::new();
    sender
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{PipelineEvent, PipelinePhase, RegionEvent};
    use std::thread;

    fn phase(phase: PipelinePhase) -> Event {
        Event::Pipeline(PipelineEvent::PhaseChanged { phase })
    }

    #[test]
    fn region_events_cross_worker_threads() {
        let (sender, receiver) = EventChannel::new();

        let handle = thread::spawn(move || {
            sender.send(Event::Region(RegionEvent::Started { total_regions: 4 }));
        });
        handle.join().unwrap();

        match receiver.recv().unwrap() {
            Event::Region(RegionEvent::Started { total_regions }) => assert_eq!(total_regions, 4),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn stream_ends_when_every_worker_is_done() {
        let (sender, receiver) = EventChannel::new();

        let workers: Vec<_> = [PipelinePhase::Preprocessing, PipelinePhase::Scoring]
            .into_iter()
            .map(|p| {
                let sender = sender.clone();
                thread::spawn(move || sender.send(phase(p)))
            })
            .collect();
        drop(sender);
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(receiver.iter().count(), 2);
        assert!(receiver.recv().is_none());
    }

    #[test]
    fn reporting_without_a_listener_is_silent() {
        null_sender().send(phase(PipelinePhase::Scoring));

        let (sender, receiver) = EventChannel::new();
        drop(receiver);
        sender.send(phase(PipelinePhase::ComparingRegions));
    }
}
