//! Dispatcher: parsers → metrics → display sink
//!
//! ```text
//!   Consumer ─▶ FrameParser ─┐
//!                            ├─▶ MetricsState ─▶ DisplaySink
//!   Consumer ─▶ FrameParser ─┘
//! ```
//!
//! One tick:
//! 1. Decode up to `max_frames_per_tick` frames, alternating between links
//! 2. Update `last_byte_at`, `link_source` and liveness
//! 3. Flush links that stopped delivering frames
//! 4. Forward the pending decode-log event if the throttle allows
//! 5. Push the measurement snapshot if it changed and no message is shown
//! 6. Publish diagnostics when the period has elapsed

use bathys_protocol::{
    FieldKind, Frame, FrameParser, ParseStats, Payload, SubCommand, MAX_LABEL_LEN,
};
use heapless::{String, Vec};

use super::diagnostics::{hex_preview, Diagnostics, LinkDiagnostics, RAW_PREVIEW_BYTES};
use crate::config::{DispatchConfig, TelemetryConfig};
use crate::link::{elapsed_ms, LinkChange, LivenessMonitor};
use crate::metrics::{LinkSource, MetricsState};
use crate::queue::Consumer;
use crate::traits::DisplaySink;

/// Links one dispatcher can merge
pub const MAX_LINKS: usize = 2;

/// Link attachment rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchError {
    /// All link slots are taken
    TooManyLinks,
    /// A link with the same source is already attached
    DuplicateLink,
}

/// Message close delay in ms; non-positive or NaN means "keep open"
pub fn auto_close_ms(auto_close_s: f32) -> u32 {
    if auto_close_s > 0.0 {
        // Float-to-int casts saturate
        (auto_close_s * 1000.0 + 0.5) as u32
    } else {
        0
    }
}

/// Per-link receive state
struct LinkChannel<'a, const N: usize> {
    source: LinkSource,
    consumer: Consumer<'a, N>,
    parser: FrameParser,
    /// Time of the last decoded frame, None when silent or never seen
    last_frame_ms: Option<u32>,
    resets: u32,
}

/// Decode-log row waiting for the throttle
struct DecodeEvent {
    name: String<MAX_LABEL_LEN>,
    value: f32,
    highlight: bool,
}

/// Owner of the metrics snapshot and of every link's consumer half
pub struct Dispatcher<'a, const N: usize> {
    config: DispatchConfig,
    links: Vec<LinkChannel<'a, N>, MAX_LINKS>,
    metrics: MetricsState,
    liveness: LivenessMonitor,
    /// Snapshot changed since the last measurement update
    dirty: bool,
    pending_decode: Option<DecodeEvent>,
    last_decode_ms: Option<u32>,
    last_diagnostics_ms: Option<u32>,
    ticks: u32,
    last_sub_command: Option<SubCommand>,
    last_name: String<MAX_LABEL_LEN>,
    last_value: f32,
}

impl<'a, const N: usize> Dispatcher<'a, N> {
    /// Create a dispatcher with no links attached
    pub fn new(config: &TelemetryConfig) -> Self {
        Self {
            config: config.dispatch.clone(),
            links: Vec::new(),
            metrics: MetricsState::new(),
            liveness: LivenessMonitor::new(config.liveness),
            dirty: false,
            pending_decode: None,
            last_decode_ms: None,
            last_diagnostics_ms: None,
            ticks: 0,
            last_sub_command: None,
            last_name: String::new(),
            last_value: 0.0,
        }
    }

    /// Take over the consumer half of a link's queue
    pub fn attach(
        &mut self,
        source: LinkSource,
        consumer: Consumer<'a, N>,
    ) -> Result<(), DispatchError> {
        if self.links.iter().any(|link| link.source == source) {
            return Err(DispatchError::DuplicateLink);
        }
        self.links
            .push(LinkChannel {
                source,
                consumer,
                parser: FrameParser::new(),
                last_frame_ms: None,
                resets: 0,
            })
            .map_err(|_| DispatchError::TooManyLinks)
    }

    /// Current snapshot
    pub fn metrics(&self) -> &MetricsState {
        &self.metrics
    }

    /// Parser counters for one link
    pub fn stats(&self, source: LinkSource) -> Option<&ParseStats> {
        self.links
            .iter()
            .find(|link| link.source == source)
            .map(|link| link.parser.stats())
    }

    /// Dispatch ticks run so far
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Run one dispatch tick
    ///
    /// Returns the number of frames decoded.
    pub fn poll<S: DisplaySink + ?Sized>(&mut self, now_ms: u32, sink: &mut S) -> usize {
        self.ticks = self.ticks.wrapping_add(1);

        let decoded = self.drain(now_ms, sink);
        self.update_liveness(now_ms);
        self.expire_silent_links(now_ms);
        self.flush_decode_event(now_ms, sink);

        if self.dirty && !sink.is_message_active() {
            sink.on_measurement_update(&self.metrics);
            self.dirty = false;
        }

        match self.last_diagnostics_ms {
            None => self.last_diagnostics_ms = Some(now_ms),
            Some(last) if now_ms.wrapping_sub(last) >= self.config.diagnostics_period_ms => {
                self.last_diagnostics_ms = Some(now_ms);
                let diagnostics = self.diagnostics(now_ms);
                sink.on_diagnostics(&diagnostics);
            }
            Some(_) => {}
        }

        decoded
    }

    /// Decode frames round-robin until the budget is spent or all links wait
    fn drain<S: DisplaySink + ?Sized>(&mut self, now_ms: u32, sink: &mut S) -> usize {
        let budget = usize::from(self.config.max_frames_per_tick);
        let mut decoded = 0;

        while decoded < budget {
            let mut progressed = false;

            for index in 0..self.links.len() {
                if decoded >= budget {
                    break;
                }
                let link = &mut self.links[index];
                let Some(frame) = link.parser.try_parse_one(&mut link.consumer) else {
                    continue;
                };
                link.last_frame_ms = Some(now_ms);
                decoded += 1;
                progressed = true;
                self.apply_frame(frame, sink);
            }

            if !progressed {
                break;
            }
        }

        decoded
    }

    fn apply_frame<S: DisplaySink + ?Sized>(&mut self, frame: Frame, sink: &mut S) {
        self.last_sub_command = Some(frame.sub_command());
        self.metrics.port_connected = true;
        self.dirty = true;

        match frame.payload {
            Payload::Pump {
                pressure_a,
                pressure_b,
            } => {
                let threshold = self.config.pump_on_threshold();
                let pressure = self.metrics.apply_pump(pressure_a, pressure_b, threshold);
                self.record_last("Pump", pressure);
            }
            Payload::FieldSample {
                field_id,
                value,
                label,
            } => {
                let kind = FieldKind::resolve(field_id);
                self.metrics.apply_sample(kind, value);

                let name = kind.display_name().unwrap_or(label.as_str());
                self.record_last(name, value);
                self.pending_decode = Some(DecodeEvent {
                    name: self.last_name.clone(),
                    value,
                    highlight: kind.highlight(),
                });
            }
            Payload::Message {
                auto_close_s, text, ..
            } => {
                self.record_last("Message", auto_close_s);
                sink.on_message(text.as_str(), auto_close_ms(auto_close_s));
            }
        }
    }

    fn record_last(&mut self, name: &str, value: f32) {
        self.last_name.clear();
        // Names never exceed the label capacity
        let _ = self.last_name.push_str(name);
        self.last_value = value;
    }

    fn update_liveness(&mut self, now_ms: u32) {
        let latest = self
            .links
            .iter()
            .filter_map(|link| link.consumer.last_byte_at().map(|at| (link.source, at)))
            .min_by_key(|&(_, at)| elapsed_ms(now_ms, at));

        if let Some((source, at)) = latest {
            if self.metrics.link_source != source {
                self.metrics.link_source = source;
                self.dirty = true;
            }
            self.metrics.last_byte_at = Some(at);
        }

        match self.liveness.evaluate(self.metrics.last_byte_at, now_ms) {
            LinkChange::Unchanged => {}
            LinkChange::Up | LinkChange::Down => {
                self.metrics.link_alive = self.liveness.is_alive();
                self.dirty = true;
            }
        }
    }

    fn expire_silent_links(&mut self, now_ms: u32) {
        let timeout = self.config.frame_timeout_ms;
        for link in self.links.iter_mut() {
            if let Some(last) = link.last_frame_ms {
                if now_ms.wrapping_sub(last) > timeout {
                    link.consumer.clear();
                    link.last_frame_ms = None;
                    link.resets = link.resets.saturating_add(1);
                }
            }
        }

        let connected = self.links.iter().any(|link| link.last_frame_ms.is_some());
        if self.metrics.port_connected && !connected {
            self.metrics.port_connected = false;
            self.dirty = true;
        }
    }

    fn flush_decode_event<S: DisplaySink + ?Sized>(&mut self, now_ms: u32, sink: &mut S) {
        if self.pending_decode.is_none() {
            return;
        }
        if let Some(last) = self.last_decode_ms {
            if now_ms.wrapping_sub(last) < self.config.decode_throttle_ms {
                return;
            }
        }
        if let Some(event) = self.pending_decode.take() {
            sink.on_decode_event(event.name.as_str(), event.value, event.highlight);
            self.last_decode_ms = Some(now_ms);
        }
    }

    /// Build a diagnostics snapshot
    pub fn diagnostics(&self, now_ms: u32) -> Diagnostics {
        let mut links = Vec::new();
        for link in self.links.iter() {
            let mut head = [0u8; RAW_PREVIEW_BYTES];
            let copied = link.consumer.peek_into(&mut head);
            let entry = LinkDiagnostics {
                source: link.source,
                stats: *link.parser.stats(),
                last_reject: link.parser.last_reject(),
                queue_len: link.consumer.len() as u32,
                overflow: link.consumer.dropped(),
                rx_bytes: link.consumer.received(),
                resets: link.resets,
                raw_head: hex_preview(&head[..copied]),
            };
            // Same capacity as `self.links`
            let _ = links.push(entry);
        }

        Diagnostics {
            now_ms,
            ticks: self.ticks,
            links,
            last_sub_command: self.last_sub_command,
            last_name: self.last_name.clone(),
            last_value: self.last_value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{ByteQueue, Producer};
    use bathys_protocol::{MAX_MESSAGE_LEN, SYNC_MARKER};

    #[derive(Default)]
    struct RecordingSink {
        updates: u32,
        last_metrics: Option<MetricsState>,
        decode: Vec<(String<MAX_LABEL_LEN>, f32, bool), 8>,
        messages: Vec<(String<MAX_MESSAGE_LEN>, u32), 4>,
        message_active: bool,
        diagnostics: Option<Diagnostics>,
    }

    impl DisplaySink for RecordingSink {
        fn on_measurement_update(&mut self, metrics: &MetricsState) {
            self.updates += 1;
            self.last_metrics = Some(metrics.clone());
        }

        fn on_decode_event(&mut self, name: &str, value: f32, highlight: bool) {
            self.decode
                .push((String::try_from(name).unwrap(), value, highlight))
                .unwrap();
        }

        fn on_message(&mut self, text: &str, auto_close_ms: u32) {
            self.messages
                .push((String::try_from(text).unwrap(), auto_close_ms))
                .unwrap();
        }

        fn is_message_active(&self) -> bool {
            self.message_active
        }

        fn on_diagnostics(&mut self, diagnostics: &Diagnostics) {
            self.diagnostics = Some(diagnostics.clone());
        }
    }

    fn feed<const N: usize>(tx: &mut Producer<'_, N>, frame: &Frame, now_ms: u32) {
        for &b in frame.encode_to_vec().unwrap().iter() {
            tx.stamp(now_ms);
            tx.push(b).unwrap();
        }
    }

    fn feed_raw<const N: usize>(tx: &mut Producer<'_, N>, bytes: &[u8], now_ms: u32) {
        for &b in bytes {
            tx.stamp(now_ms);
            tx.push(b).unwrap();
        }
    }

    #[test]
    fn test_gravity_toolface_sample() {
        let mut queue: ByteQueue<512> = ByteQueue::new();
        let (mut tx, rx) = queue.split();
        let mut dispatcher = Dispatcher::new(&TelemetryConfig::default());
        dispatcher.attach(LinkSource::Primary, rx).unwrap();
        let mut sink = RecordingSink::default();

        feed(&mut tx, &Frame::sample(0x13, 42.0, "").unwrap(), 0);
        assert_eq!(dispatcher.poll(5, &mut sink), 1);

        let m = dispatcher.metrics();
        assert_eq!(m.toolface, 42.0);
        assert_eq!(m.toolface_kind, FieldKind::GravityToolface);
        assert_eq!(m.toolface_history[4], (42.0, FieldKind::GravityToolface));
        assert!(m.port_connected);

        assert_eq!(sink.updates, 1);
        assert_eq!(sink.decode.len(), 1);
        assert_eq!(sink.decode[0].0.as_str(), "GTF");
        assert_eq!(sink.decode[0].1, 42.0);
        assert!(!sink.decode[0].2);
    }

    #[test]
    fn test_label_never_overrides_identifier() {
        let mut queue: ByteQueue<512> = ByteQueue::new();
        let (mut tx, rx) = queue.split();
        let mut dispatcher = Dispatcher::new(&TelemetryConfig::default());
        dispatcher.attach(LinkSource::Primary, rx).unwrap();
        let mut sink = RecordingSink::default();

        feed(&mut tx, &Frame::sample(0x10, 12.5, "Azi").unwrap(), 0);
        feed(&mut tx, &Frame::sample(0x16, 71.0, "Temp").unwrap(), 0);
        dispatcher.poll(5, &mut sink);

        let m = dispatcher.metrics();
        assert_eq!(m.inclination, 12.5);
        assert_eq!(m.azimuth, 0.0);
        // Only the latest pending event is forwarded, with the label as name
        assert_eq!(sink.decode.len(), 1);
        assert_eq!(sink.decode[0].0.as_str(), "Temp");
    }

    #[test]
    fn test_sync_sample_highlighted() {
        let mut queue: ByteQueue<512> = ByteQueue::new();
        let (mut tx, rx) = queue.split();
        let mut dispatcher = Dispatcher::new(&TelemetryConfig::default());
        dispatcher.attach(LinkSource::Primary, rx).unwrap();
        let mut sink = RecordingSink::default();

        feed(&mut tx, &Frame::sample(0x00, 1.0, "").unwrap(), 0);
        dispatcher.poll(5, &mut sink);
        assert_eq!(sink.decode[0].0.as_str(), "Sync");
        assert!(sink.decode[0].2);
    }

    #[test]
    fn test_pump_frame() {
        let mut queue: ByteQueue<512> = ByteQueue::new();
        let (mut tx, rx) = queue.split();
        let mut dispatcher = Dispatcher::new(&TelemetryConfig::default());
        dispatcher.attach(LinkSource::Primary, rx).unwrap();
        let mut sink = RecordingSink::default();

        feed(&mut tx, &Frame::pump(0.0, 15.3), 0);
        dispatcher.poll(5, &mut sink);

        let m = dispatcher.metrics();
        assert!(m.pump_pressure_valid);
        assert_eq!(m.pump_pressure, 15.3);
        assert!(m.pump_on);
        // Pump frames do not produce decode-log rows
        assert!(sink.decode.is_empty());

        let diagnostics = dispatcher.diagnostics(5);
        assert_eq!(diagnostics.last_sub_command, Some(SubCommand::Pump));
        assert_eq!(diagnostics.last_name.as_str(), "Pump");
        assert_eq!(diagnostics.last_value, 15.3);
    }

    #[test]
    fn test_message_forwarded() {
        let mut queue: ByteQueue<512> = ByteQueue::new();
        let (mut tx, rx) = queue.split();
        let mut dispatcher = Dispatcher::new(&TelemetryConfig::default());
        dispatcher.attach(LinkSource::Primary, rx).unwrap();
        let mut sink = RecordingSink::default();

        feed(&mut tx, &Frame::message("Survey complete", 5.0).unwrap(), 0);
        feed(&mut tx, &Frame::message("Check mud motor", -1.0).unwrap(), 0);
        dispatcher.poll(5, &mut sink);

        assert_eq!(sink.messages.len(), 2);
        assert_eq!(sink.messages[0].0.as_str(), "Survey complete");
        assert_eq!(sink.messages[0].1, 5000);
        assert_eq!(sink.messages[1].1, 0);
    }

    #[test]
    fn test_auto_close_ms() {
        assert_eq!(auto_close_ms(0.0), 0);
        assert_eq!(auto_close_ms(-3.0), 0);
        assert_eq!(auto_close_ms(f32::NAN), 0);
        assert_eq!(auto_close_ms(2.5), 2500);
        assert_eq!(auto_close_ms(0.0016), 2);
        assert_eq!(auto_close_ms(f32::INFINITY), u32::MAX);
    }

    #[test]
    fn test_frame_budget_per_tick() {
        let mut queue: ByteQueue<4096> = ByteQueue::new();
        let (mut tx, rx) = queue.split();
        let mut dispatcher = Dispatcher::new(&TelemetryConfig::default());
        dispatcher.attach(LinkSource::Primary, rx).unwrap();
        let mut sink = RecordingSink::default();

        let frame = Frame::pump(3.0, 0.0);
        for _ in 0..150 {
            feed(&mut tx, &frame, 0);
        }

        assert_eq!(dispatcher.poll(5, &mut sink), 100);
        assert_eq!(dispatcher.poll(10, &mut sink), 50);
        assert_eq!(dispatcher.poll(15, &mut sink), 0);
        assert_eq!(dispatcher.stats(LinkSource::Primary).unwrap().frames_ok, 150);
    }

    #[test]
    fn test_corruption_recovery() {
        let mut queue: ByteQueue<512> = ByteQueue::new();
        let (mut tx, rx) = queue.split();
        let mut dispatcher = Dispatcher::new(&TelemetryConfig::default());
        dispatcher.attach(LinkSource::Primary, rx).unwrap();
        let mut sink = RecordingSink::default();

        let mut bad = Frame::pump(99.0, 0.0).encode_to_vec().unwrap();
        let last = bad.len() - 1;
        bad[last] ^= 0xFF;
        feed_raw(&mut tx, &bad, 0);
        feed(&mut tx, &Frame::pump(7.5, 0.0), 0);

        assert_eq!(dispatcher.poll(5, &mut sink), 1);
        assert_eq!(dispatcher.metrics().pump_pressure, 7.5);
        let stats = dispatcher.stats(LinkSource::Primary).unwrap();
        assert_eq!(stats.frames_ok, 1);
        assert!(stats.bad_checksum >= 1);
    }

    #[test]
    fn test_split_arrival() {
        let mut queue: ByteQueue<512> = ByteQueue::new();
        let (mut tx, rx) = queue.split();
        let mut dispatcher = Dispatcher::new(&TelemetryConfig::default());
        dispatcher.attach(LinkSource::Primary, rx).unwrap();
        let mut sink = RecordingSink::default();

        let bytes = Frame::sample(0x11, 271.0, "").unwrap().encode_to_vec().unwrap();
        let mut decoded = 0;
        for (i, &b) in bytes.iter().enumerate() {
            feed_raw(&mut tx, &[b], i as u32);
            decoded += dispatcher.poll(i as u32, &mut sink);
        }
        assert_eq!(decoded, 1);
        assert_eq!(dispatcher.metrics().azimuth, 271.0);
    }

    #[test]
    fn test_decode_events_throttled() {
        let mut queue: ByteQueue<512> = ByteQueue::new();
        let (mut tx, rx) = queue.split();
        let mut dispatcher = Dispatcher::new(&TelemetryConfig::default());
        dispatcher.attach(LinkSource::Primary, rx).unwrap();
        let mut sink = RecordingSink::default();

        feed(&mut tx, &Frame::sample(0x10, 1.0, "").unwrap(), 0);
        dispatcher.poll(0, &mut sink);
        assert_eq!(sink.decode.len(), 1);

        feed(&mut tx, &Frame::sample(0x10, 2.0, "").unwrap(), 100);
        dispatcher.poll(100, &mut sink);
        feed(&mut tx, &Frame::sample(0x11, 3.0, "").unwrap(), 200);
        dispatcher.poll(200, &mut sink);
        assert_eq!(sink.decode.len(), 1);

        // Latest pending row wins once the throttle opens
        dispatcher.poll(300, &mut sink);
        assert_eq!(sink.decode.len(), 2);
        assert_eq!(sink.decode[1].0.as_str(), "Azi");
        assert_eq!(sink.decode[1].1, 3.0);

        dispatcher.poll(700, &mut sink);
        assert_eq!(sink.decode.len(), 2);
    }

    #[test]
    fn test_update_deferred_while_message_shown() {
        let mut queue: ByteQueue<512> = ByteQueue::new();
        let (mut tx, rx) = queue.split();
        let mut dispatcher = Dispatcher::new(&TelemetryConfig::default());
        dispatcher.attach(LinkSource::Primary, rx).unwrap();
        let mut sink = RecordingSink {
            message_active: true,
            ..Default::default()
        };

        feed(&mut tx, &Frame::sample(0x10, 4.0, "").unwrap(), 0);
        dispatcher.poll(5, &mut sink);
        dispatcher.poll(10, &mut sink);
        assert_eq!(sink.updates, 0);

        sink.message_active = false;
        dispatcher.poll(15, &mut sink);
        assert_eq!(sink.updates, 1);
        assert_eq!(sink.last_metrics.as_ref().unwrap().inclination, 4.0);

        // Nothing changed since
        dispatcher.poll(20, &mut sink);
        assert_eq!(sink.updates, 1);
    }

    #[test]
    fn test_liveness_hysteresis() {
        let mut queue: ByteQueue<64> = ByteQueue::new();
        let (mut tx, rx) = queue.split();
        let mut dispatcher = Dispatcher::new(&TelemetryConfig::default());
        dispatcher.attach(LinkSource::Primary, rx).unwrap();
        let mut sink = RecordingSink::default();

        feed_raw(&mut tx, &[0x00], 0);

        dispatcher.poll(9_900, &mut sink);
        assert!(dispatcher.metrics().link_alive);
        assert_eq!(dispatcher.metrics().last_byte_at, Some(0));
        assert_eq!(dispatcher.metrics().link_source, LinkSource::Primary);

        dispatcher.poll(11_000, &mut sink);
        assert!(dispatcher.metrics().link_alive);

        dispatcher.poll(13_000, &mut sink);
        assert!(!dispatcher.metrics().link_alive);
        assert!(!sink.last_metrics.as_ref().unwrap().link_alive);
    }

    #[test]
    fn test_link_source_follows_latest_byte() {
        let mut primary: ByteQueue<64> = ByteQueue::new();
        let mut secondary: ByteQueue<64> = ByteQueue::new();
        let (mut tx_a, rx_a) = primary.split();
        let (mut tx_b, rx_b) = secondary.split();
        let mut dispatcher = Dispatcher::new(&TelemetryConfig::default());
        dispatcher.attach(LinkSource::Primary, rx_a).unwrap();
        dispatcher.attach(LinkSource::Secondary, rx_b).unwrap();
        let mut sink = RecordingSink::default();

        dispatcher.poll(0, &mut sink);
        assert_eq!(dispatcher.metrics().link_source, LinkSource::Unknown);
        assert!(!dispatcher.metrics().link_alive);

        feed_raw(&mut tx_a, &[0x11], 100);
        feed_raw(&mut tx_b, &[0x22], 200);
        dispatcher.poll(250, &mut sink);
        assert_eq!(dispatcher.metrics().link_source, LinkSource::Secondary);
        assert_eq!(dispatcher.metrics().last_byte_at, Some(200));

        feed_raw(&mut tx_a, &[0x33], 300);
        dispatcher.poll(350, &mut sink);
        assert_eq!(dispatcher.metrics().link_source, LinkSource::Primary);
    }

    #[test]
    fn test_byte_stamped_after_poll_time() {
        let mut primary: ByteQueue<64> = ByteQueue::new();
        let mut secondary: ByteQueue<64> = ByteQueue::new();
        let (mut tx_a, rx_a) = primary.split();
        let (mut tx_b, rx_b) = secondary.split();
        let mut dispatcher = Dispatcher::new(&TelemetryConfig::default());
        dispatcher.attach(LinkSource::Primary, rx_a).unwrap();
        dispatcher.attach(LinkSource::Secondary, rx_b).unwrap();
        let mut sink = RecordingSink::default();

        feed_raw(&mut tx_a, &[0x00], 1_000);
        dispatcher.poll(1_000, &mut sink);
        assert!(dispatcher.metrics().link_alive);

        // Receive task stamped these after the poll time was sampled
        feed_raw(&mut tx_a, &[0x00], 1_900);
        feed_raw(&mut tx_b, &[0x00], 2_001);
        dispatcher.poll(2_000, &mut sink);

        assert!(dispatcher.metrics().link_alive);
        assert_eq!(dispatcher.metrics().link_source, LinkSource::Secondary);
        assert_eq!(dispatcher.metrics().last_byte_at, Some(2_001));
    }

    #[test]
    fn test_frames_from_both_links() {
        let mut primary: ByteQueue<256> = ByteQueue::new();
        let mut secondary: ByteQueue<256> = ByteQueue::new();
        let (mut tx_a, rx_a) = primary.split();
        let (mut tx_b, rx_b) = secondary.split();
        let mut dispatcher = Dispatcher::new(&TelemetryConfig::default());
        dispatcher.attach(LinkSource::Primary, rx_a).unwrap();
        dispatcher.attach(LinkSource::Secondary, rx_b).unwrap();
        let mut sink = RecordingSink::default();

        feed(&mut tx_a, &Frame::sample(0x10, 3.0, "").unwrap(), 0);
        feed(&mut tx_b, &Frame::sample(0x11, 90.0, "").unwrap(), 0);
        assert_eq!(dispatcher.poll(5, &mut sink), 2);

        assert_eq!(dispatcher.metrics().inclination, 3.0);
        assert_eq!(dispatcher.metrics().azimuth, 90.0);
        assert_eq!(dispatcher.stats(LinkSource::Secondary).unwrap().frames_ok, 1);
    }

    #[test]
    fn test_frame_silence_flushes_link() {
        let mut queue: ByteQueue<256> = ByteQueue::new();
        let (mut tx, rx) = queue.split();
        let mut dispatcher = Dispatcher::new(&TelemetryConfig::default());
        dispatcher.attach(LinkSource::Primary, rx).unwrap();
        let mut sink = RecordingSink::default();

        feed(&mut tx, &Frame::pump(3.0, 0.0), 0);
        dispatcher.poll(0, &mut sink);
        assert!(dispatcher.metrics().port_connected);

        // Half a frame that never completes
        feed_raw(&mut tx, &[SYNC_MARKER[0], SYNC_MARKER[1], 0x09, 0x09, 0x01], 500);
        dispatcher.poll(2_000, &mut sink);
        assert!(dispatcher.metrics().port_connected);
        assert_eq!(tx.len(), 5);

        dispatcher.poll(2_001, &mut sink);
        assert!(!dispatcher.metrics().port_connected);
        assert!(tx.is_empty());
        assert_eq!(dispatcher.diagnostics(2_001).links[0].resets, 1);

        // A new frame reconnects
        feed(&mut tx, &Frame::pump(3.0, 0.0), 2_100);
        dispatcher.poll(2_100, &mut sink);
        assert!(dispatcher.metrics().port_connected);
    }

    #[test]
    fn test_diagnostics_period() {
        let mut queue: ByteQueue<256> = ByteQueue::new();
        let (mut tx, rx) = queue.split();
        let mut dispatcher = Dispatcher::new(&TelemetryConfig::default());
        dispatcher.attach(LinkSource::Primary, rx).unwrap();
        let mut sink = RecordingSink::default();

        dispatcher.poll(0, &mut sink);
        feed(&mut tx, &Frame::sample(0x12, 180.0, "").unwrap(), 10);
        feed_raw(&mut tx, &[SYNC_MARKER[0], SYNC_MARKER[1], 0x09], 20);
        dispatcher.poll(500, &mut sink);
        assert!(sink.diagnostics.is_none());

        dispatcher.poll(1_000, &mut sink);
        let diagnostics = sink.diagnostics.take().unwrap();
        assert_eq!(diagnostics.ticks, 3);
        assert_eq!(diagnostics.last_sub_command, Some(SubCommand::FieldSample));
        assert_eq!(diagnostics.last_name.as_str(), "TF");
        assert_eq!(diagnostics.links.len(), 1);

        let link = &diagnostics.links[0];
        assert_eq!(link.source, LinkSource::Primary);
        assert_eq!(link.stats.frames_ok, 1);
        assert_eq!(link.queue_len, 3);
        assert_eq!(link.raw_head.as_str(), "RAW: 40 46 09");
        assert_eq!(link.overflow, 0);
        assert!(link.rx_bytes > 3);

        dispatcher.poll(1_500, &mut sink);
        assert!(sink.diagnostics.is_none());
    }

    #[test]
    fn test_attach_limits() {
        let mut a: ByteQueue<8> = ByteQueue::new();
        let mut b: ByteQueue<8> = ByteQueue::new();
        let mut c: ByteQueue<8> = ByteQueue::new();
        let mut d: ByteQueue<8> = ByteQueue::new();
        let (_tx_a, rx_a) = a.split();
        let (_tx_b, rx_b) = b.split();
        let (_tx_c, rx_c) = c.split();
        let (_tx_d, rx_d) = d.split();

        let mut dispatcher = Dispatcher::new(&TelemetryConfig::default());
        dispatcher.attach(LinkSource::Primary, rx_a).unwrap();
        assert_eq!(
            dispatcher.attach(LinkSource::Primary, rx_b),
            Err(DispatchError::DuplicateLink)
        );
        dispatcher.attach(LinkSource::Secondary, rx_c).unwrap();
        assert_eq!(
            dispatcher.attach(LinkSource::Unknown, rx_d),
            Err(DispatchError::TooManyLinks)
        );
    }
}
