//! MIDI-like events and the lock-free cross-thread queue.
//!
//! Hosts deliver note and controller events with no guaranteed thread
//! affinity, so the engine accepts them two ways: pushed through a
//! wait-free SPSC ring buffer ([`EventSender`] / [`EventReceiver`],
//! backed by `rtrb`) from any single producer thread, or injected
//! directly on the render thread via `SynthEngine::handle_event`.
//!
//! The queue is fixed-capacity and created at engine construction; a
//! full queue drops the event rather than blocking the producer.

use rtrb::{Consumer, Producer, RingBuffer};

/// Default queue capacity, events per block burst.
pub const EVENT_QUEUE_CAPACITY: usize = 256;

/// A discrete performance event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MidiEvent {
    /// Key pressed.
    NoteOn {
        /// MIDI note number, 0-127.
        note: u8,
        /// Velocity, 0-127. Zero is treated as a note off.
        velocity: u8,
    },
    /// Key released.
    NoteOff {
        /// MIDI note number, 0-127.
        note: u8,
    },
    /// Controller moved.
    ControlChange {
        /// Controller number.
        cc: u8,
        /// Controller value, 0-127.
        value: u8,
    },
    /// Pitch wheel moved.
    PitchBend {
        /// Normalized bend, -1.0 to +1.0.
        value: f32,
    },
    /// Program (patch) selected. Consumed but not acted on by the core.
    ProgramChange {
        /// Program number.
        program: u8,
    },
    /// Channel pressure; maps to the smoothed velocity target.
    Aftertouch {
        /// Pressure, 0-127.
        pressure: u8,
    },
    /// Silence everything (CC 123 equivalent).
    AllNotesOff,
}

/// Producer half of the event queue. Send to the engine from one thread.
#[derive(Debug)]
pub struct EventSender {
    producer: Producer<MidiEvent>,
}

impl EventSender {
    /// Enqueue an event without blocking.
    ///
    /// Returns `false` if the queue was full and the event was dropped.
    pub fn send(&mut self, event: MidiEvent) -> bool {
        self.producer.push(event).is_ok()
    }
}

/// Consumer half, owned by the engine and drained at block start.
#[derive(Debug)]
pub struct EventReceiver {
    consumer: Consumer<MidiEvent>,
}

impl EventReceiver {
    /// Pop the next pending event, if any. Wait-free.
    #[inline]
    pub fn pop(&mut self) -> Option<MidiEvent> {
        self.consumer.pop().ok()
    }
}

/// Create a connected sender/receiver pair.
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    let (producer, consumer) = RingBuffer::new(capacity.max(1));
    (EventSender { producer }, EventReceiver { consumer })
}
