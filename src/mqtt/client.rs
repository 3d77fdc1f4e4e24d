//! MQTT 3.1.1 client with hand-built frames and stubborn retry.
//!
//! Framing is minimal on purpose: CONNECT/CONNACK, PUBLISH/PUBACK,
//! SUBSCRIBE/SUBACK, PINGREQ/PINGRESP and DISCONNECT, QoS 0 and 1 only.
//! On any connection-level failure the client rebuilds the transport
//! from scratch through [`MqttClient::reconnect`], which retries forever
//! at a fixed cadence, and [`MqttClient::publish`] rides that loop until
//! the message is out.

use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::config::{MqttMessage, MqttSection};
use crate::error::NetError;

use super::transport::NetTransport;

/// Socket connect (and handshake read) timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause between reconnect attempts. Fixed, not backed off.
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Pause between ping retries before a full reconnect kicks in.
const PING_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Inbound message callback.
pub trait MessageHandler {
    fn on_message(&mut self, topic: &str, payload: &[u8]);
}

/// Adapts a device runtime to the message-handler seam.
pub struct RuntimeHandler<'a, R: crate::app::ports::DeviceRuntime>(pub &'a mut R);

impl<R: crate::app::ports::DeviceRuntime> MessageHandler for RuntimeHandler<'_, R> {
    fn on_message(&mut self, topic: &str, payload: &[u8]) {
        self.0.on_message(topic, payload);
    }
}

fn qos_check(qos: u8) -> Result<(), NetError> {
    if qos > 1 {
        return Err(NetError::QosUnsupported(qos));
    }
    Ok(())
}

pub struct MqttClient<T: NetTransport> {
    transport: T,
    host: String,
    port: u16,
    client_id: String,
    user: Option<String>,
    password: Option<String>,
    keepalive: u16,
    last_will: Option<MqttMessage>,
    pid: u16,
    reconnect_delay: Duration,
    ping_retry_delay: Duration,
}

impl<T: NetTransport> MqttClient<T> {
    /// Build a client from the `mqtt` config section. The last-will is
    /// armed here so it rides in every CONNECT, including the first.
    pub fn from_section(transport: T, section: &MqttSection) -> Self {
        let cfg = &section.config;
        Self {
            transport,
            host: cfg.server.clone(),
            port: cfg.port,
            client_id: cfg.client_id.clone(),
            user: cfg.user.clone(),
            password: cfg.password.clone(),
            keepalive: cfg.keepalive,
            last_will: section.lwt.clone(),
            pid: 0,
            reconnect_delay: RECONNECT_DELAY,
            ping_retry_delay: PING_RETRY_DELAY,
        }
    }

    /// Override the retry cadences (tests use zero delays).
    pub fn with_delays(mut self, reconnect: Duration, ping_retry: Duration) -> Self {
        self.reconnect_delay = reconnect;
        self.ping_retry_delay = ping_retry;
        self
    }

    // ── Connection ────────────────────────────────────────────

    /// Open a fresh connection and perform the CONNECT handshake.
    /// Returns the broker's session-present flag.
    ///
    /// Any existing socket is discarded wholesale first. A busy error
    /// from the socket connect itself is tolerated; if the socket turns
    /// out unusable the handshake fails and the caller retries.
    pub fn connect(&mut self, clean_session: bool) -> Result<bool, NetError> {
        self.transport.close();
        match self.transport.connect(&self.host, self.port, CONNECT_TIMEOUT) {
            Ok(()) | Err(NetError::Busy) => {}
            Err(e) => return Err(e),
        }

        // Variable header: protocol name, level 4, flags, keepalive.
        let mut var = vec![0x00, 0x04, b'M', b'Q', b'T', b'T', 0x04, 0x00, 0x00, 0x00];
        let mut flags = u8::from(clean_session) << 1;
        if self.user.is_some() {
            flags |= 0xC0;
        }
        if let Some(lw) = &self.last_will {
            flags |= 0x04 | ((lw.qos & 0x01) << 3) | (u8::from(lw.retain) << 5);
        }
        var[7] = flags;
        var[8..10].copy_from_slice(&self.keepalive.to_be_bytes());

        let mut payload = Vec::new();
        push_str(&mut payload, &self.client_id);
        if let Some(lw) = &self.last_will {
            push_str(&mut payload, &lw.topic);
            push_str(&mut payload, &lw.msg);
        }
        if let Some(user) = &self.user {
            push_str(&mut payload, user);
            push_str(&mut payload, self.password.as_deref().unwrap_or(""));
        }

        let mut pkt = vec![0x10];
        push_remaining_len(&mut pkt, var.len() + payload.len());
        pkt.extend_from_slice(&var);
        pkt.extend_from_slice(&payload);
        self.transport.write_all(&pkt)?;

        let mut ack = [0u8; 4];
        self.read_exact(&mut ack)?;
        if ack[0] != 0x20 || ack[1] != 0x02 {
            return Err(NetError::BadHandshake(ack[0]));
        }
        if ack[3] != 0 {
            return Err(NetError::BadHandshake(ack[3]));
        }
        debug!("MQTT connected to {}:{}", self.host, self.port);
        Ok(ack[2] & 1 == 1)
    }

    /// Reconnect until it works. The attempt count is logged but the
    /// delay stays fixed.
    pub fn reconnect(&mut self) {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            info!("Attempting MQTT reconnect (attempt {attempt})...");
            match self.connect(true) {
                Ok(_) => {
                    info!("MQTT reconnect successful");
                    return;
                }
                Err(e) => {
                    warn!("MQTT reconnect attempt {attempt} failed: {e}");
                    thread::sleep(self.reconnect_delay);
                }
            }
        }
    }

    pub fn disconnect(&mut self) {
        let _ = self.transport.write_all(&[0xE0, 0x00]);
        self.transport.close();
    }

    // ── Publish ───────────────────────────────────────────────

    /// Publish, reconnecting and resending until the broker takes it.
    /// Unsupported QoS is a caller bug and fails immediately instead.
    pub fn publish(&mut self, topic: &str, msg: &[u8], retain: bool, qos: u8) -> Result<(), NetError> {
        qos_check(qos)?;
        loop {
            match self.try_publish(topic, msg, retain, qos) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!("MQTT publish to {topic} failed: {e}");
                    self.reconnect();
                }
            }
        }
    }

    fn try_publish(&mut self, topic: &str, msg: &[u8], retain: bool, qos: u8) -> Result<(), NetError> {
        self.transport.set_nonblocking(false)?;
        let mut pkt = vec![0x30 | (qos << 1) | u8::from(retain)];
        let mut sz = 2 + topic.len() + msg.len();
        if qos > 0 {
            sz += 2;
        }
        push_remaining_len(&mut pkt, sz);
        push_str(&mut pkt, topic);
        let pid = if qos > 0 {
            let pid = self.next_pid();
            pkt.extend_from_slice(&pid.to_be_bytes());
            pid
        } else {
            0
        };
        pkt.extend_from_slice(msg);
        self.transport.write_all(&pkt)?;

        if qos == 1 {
            let mut ack = [0u8; 4];
            self.read_exact(&mut ack)?;
            if ack[0] != 0x40 || ack[1] != 0x02 || u16::from_be_bytes([ack[2], ack[3]]) != pid {
                return Err(NetError::BadFrame);
            }
        }
        Ok(())
    }

    // ── Subscribe / receive ───────────────────────────────────

    pub fn subscribe(&mut self, topic: &str, qos: u8) -> Result<(), NetError> {
        qos_check(qos)?;
        self.transport.set_nonblocking(false)?;
        let pid = self.next_pid();
        let mut pkt = vec![0x82];
        push_remaining_len(&mut pkt, 2 + 2 + topic.len() + 1);
        pkt.extend_from_slice(&pid.to_be_bytes());
        push_str(&mut pkt, topic);
        pkt.push(qos);
        self.transport.write_all(&pkt)?;

        let mut ack = [0u8; 5];
        self.read_exact(&mut ack)?;
        if ack[0] != 0x90 || u16::from_be_bytes([ack[2], ack[3]]) != pid || ack[4] == 0x80 {
            return Err(NetError::BadFrame);
        }
        Ok(())
    }

    /// Non-blocking poll for one inbound message. Transport trouble is
    /// answered with a reconnect, never an error to the caller.
    pub fn check_msg<H: MessageHandler>(&mut self, handler: &mut H) {
        if let Err(e) = self.transport.set_nonblocking(true) {
            warn!("MQTT poll setup failed: {e}");
            self.reconnect();
            return;
        }
        match self.wait_msg_once(handler) {
            Ok(_) => {}
            Err(e) => {
                warn!("MQTT receive error: {e}");
                self.reconnect();
            }
        }
    }

    fn wait_msg_once<H: MessageHandler>(&mut self, handler: &mut H) -> Result<Option<()>, NetError> {
        let mut header = [0u8; 1];
        match self.transport.read(&mut header) {
            Ok(_) => {}
            Err(NetError::Busy) => return Ok(None), // nothing pending
            Err(e) => return Err(e),
        }
        let op = header[0];
        if op == 0xD0 {
            // PINGRESP carries a zero length byte.
            self.read_exact(&mut header)?;
            return Ok(None);
        }
        if op & 0xF0 != 0x30 {
            return Err(NetError::BadFrame);
        }

        let sz = self.read_remaining_len()?;
        let mut frame = vec![0u8; sz];
        self.read_exact(&mut frame)?;
        if frame.len() < 2 {
            return Err(NetError::BadFrame);
        }
        let tlen = u16::from_be_bytes([frame[0], frame[1]]) as usize;
        if frame.len() < 2 + tlen {
            return Err(NetError::BadFrame);
        }
        let topic =
            core::str::from_utf8(&frame[2..2 + tlen]).map_err(|_| NetError::BadFrame)?;

        let qos = (op >> 1) & 0x03;
        let mut off = 2 + tlen;
        let mut pid = 0u16;
        if qos > 0 {
            if frame.len() < off + 2 {
                return Err(NetError::BadFrame);
            }
            pid = u16::from_be_bytes([frame[off], frame[off + 1]]);
            off += 2;
        }
        handler.on_message(topic, &frame[off..]);
        if qos == 1 {
            let ack = [0x40, 0x02, (pid >> 8) as u8, pid as u8];
            self.transport.write_all(&ack)?;
        }
        Ok(Some(()))
    }

    // ── Keepalive ─────────────────────────────────────────────

    pub fn ping(&mut self) -> Result<(), NetError> {
        self.transport.set_nonblocking(false)?;
        self.transport.write_all(&[0xC0, 0x00])
    }

    /// Ping until one succeeds: after `retry` consecutive failures each
    /// further failure forces a full reconnect.
    pub fn ping_with_retry(&mut self, retry: u32) {
        let mut tries: u32 = 0;
        loop {
            tries += 1;
            match self.ping() {
                Ok(()) => return,
                Err(e) => {
                    warn!("Error pinging MQTT server, try {tries}: {e}");
                    thread::sleep(self.ping_retry_delay);
                    if tries >= retry {
                        self.reconnect();
                    }
                }
            }
        }
    }

    // ── Session bring-up ──────────────────────────────────────

    /// Full session establishment: connect, announce `online`, subscribe
    /// to the configured topics, then drain one pending message.
    pub fn bring_up<H: MessageHandler>(
        &mut self,
        section: &MqttSection,
        handler: &mut H,
    ) -> Result<(), NetError> {
        self.connect(true)?;
        if let Some(online) = &section.online {
            info!("Announcing online on {}", online.topic);
            self.publish(&online.topic, online.msg.as_bytes(), online.retain, online.qos)?;
        }
        for sub in &section.subscribe {
            info!("Subscribing to {}", sub.topic);
            self.subscribe(&sub.topic, sub.qos)?;
        }
        if !section.subscribe.is_empty() {
            self.check_msg(handler);
        }
        Ok(())
    }

    // ── Wire helpers ──────────────────────────────────────────

    fn next_pid(&mut self) -> u16 {
        self.pid = self.pid.wrapping_add(1);
        if self.pid == 0 {
            self.pid = 1;
        }
        self.pid
    }

    /// Fill `buf`, retrying through transient busy conditions.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), NetError> {
        let mut off = 0;
        while off < buf.len() {
            match self.transport.read(&mut buf[off..]) {
                Ok(n) => off += n,
                Err(NetError::Busy) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn read_remaining_len(&mut self) -> Result<usize, NetError> {
        let mut n = 0usize;
        let mut shift = 0u32;
        loop {
            let mut b = [0u8; 1];
            self.read_exact(&mut b)?;
            n |= usize::from(b[0] & 0x7F) << shift;
            if b[0] & 0x80 == 0 {
                return Ok(n);
            }
            shift += 7;
            if shift > 21 {
                return Err(NetError::BadFrame);
            }
        }
    }
}

fn push_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u16).to_be_bytes());
    buf.extend_from_slice(s.as_bytes());
}

fn push_remaining_len(buf: &mut Vec<u8>, mut len: usize) {
    loop {
        let mut b = (len & 0x7F) as u8;
        len >>= 7;
        if len > 0 {
            b |= 0x80;
        }
        buf.push(b);
        if len == 0 {
            return;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MqttConfig, Subscription};
    use std::collections::VecDeque;

    /// Scripted transport: queued connect results, queued read chunks,
    /// captured writes.
    #[derive(Default)]
    struct MockTransport {
        connect_results: VecDeque<Result<(), NetError>>,
        reads: VecDeque<Result<Vec<u8>, NetError>>,
        written: Vec<u8>,
        connects: u32,
        closes: u32,
    }

    impl NetTransport for MockTransport {
        fn connect(&mut self, _host: &str, _port: u16, _t: Duration) -> Result<(), NetError> {
            self.connects += 1;
            self.connect_results.pop_front().unwrap_or(Ok(()))
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize, NetError> {
            match self.reads.pop_front() {
                Some(Ok(chunk)) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        self.reads.push_front(Ok(chunk[n..].to_vec()));
                    }
                    Ok(n)
                }
                Some(Err(e)) => Err(e),
                None => Err(NetError::Busy),
            }
        }

        fn write_all(&mut self, buf: &[u8]) -> Result<(), NetError> {
            self.written.extend_from_slice(buf);
            Ok(())
        }

        fn set_nonblocking(&mut self, _nonblocking: bool) -> Result<(), NetError> {
            Ok(())
        }

        fn close(&mut self) {
            self.closes += 1;
        }
    }

    fn section(user: Option<&str>, lwt: Option<MqttMessage>) -> MqttSection {
        MqttSection {
            config: MqttConfig {
                server: "broker.local".into(),
                port: 1883,
                client_id: "amp-01".into(),
                user: user.map(Into::into),
                password: user.map(|_| "secret".into()),
                keepalive: 60,
                ssl: false,
                ssl_params: None,
            },
            lwt,
            online: None,
            subscribe: Vec::new(),
            retry: 3,
        }
    }

    fn client(transport: MockTransport, section: &MqttSection) -> MqttClient<MockTransport> {
        MqttClient::from_section(transport, section)
            .with_delays(Duration::ZERO, Duration::ZERO)
    }

    const CONNACK_OK: [u8; 4] = [0x20, 0x02, 0x00, 0x00];

    #[test]
    fn connect_frame_layout_minimal() {
        let mut transport = MockTransport::default();
        transport.reads.push_back(Ok(CONNACK_OK.to_vec()));
        let s = section(None, None);
        let mut c = client(transport, &s);

        assert_eq!(c.connect(true), Ok(false));

        // 0x10, remaining 18, protocol name/level, clean-session flags,
        // keepalive 60, then the client id.
        let mut expected = vec![0x10, 18, 0x00, 0x04];
        expected.extend_from_slice(b"MQTT");
        expected.extend_from_slice(&[0x04, 0x02, 0x00, 0x3C, 0x00, 0x06]);
        expected.extend_from_slice(b"amp-01");
        assert_eq!(c.transport.written, expected);
        assert_eq!(c.transport.closes, 1);
    }

    #[test]
    fn connect_flags_carry_credentials_and_will() {
        let mut transport = MockTransport::default();
        transport.reads.push_back(Ok(CONNACK_OK.to_vec()));
        let lwt = MqttMessage {
            topic: "amp-01/status".into(),
            msg: "offline".into(),
            retain: true,
            qos: 1,
        };
        let s = section(Some("ops"), Some(lwt));
        let mut c = client(transport, &s);
        c.connect(true).unwrap();

        // flags: clean session | will | will qos1 | will retain | user | pass
        let flags = c.transport.written[9];
        assert_eq!(flags, 0x02 | 0x04 | 0x08 | 0x20 | 0xC0);
        // payload order: client id, will topic, will message, user, password
        let payload = &c.transport.written[12..];
        let mut expected = Vec::new();
        for s in ["amp-01", "amp-01/status", "offline", "ops", "secret"] {
            push_str(&mut expected, s);
        }
        assert_eq!(payload, expected);
    }

    #[test]
    fn connack_return_code_is_fatal() {
        let mut transport = MockTransport::default();
        transport.reads.push_back(Ok(vec![0x20, 0x02, 0x00, 0x05]));
        let s = section(None, None);
        let mut c = client(transport, &s);
        assert_eq!(c.connect(true), Err(NetError::BadHandshake(5)));

        let mut transport = MockTransport::default();
        transport.reads.push_back(Ok(vec![0x99, 0x02, 0x00, 0x00]));
        let mut c = client(transport, &s);
        assert_eq!(c.connect(true), Err(NetError::BadHandshake(0x99)));
    }

    #[test]
    fn handshake_read_rides_through_busy() {
        let mut transport = MockTransport::default();
        // CONNACK delivered in two chunks with a busy gap.
        transport.reads.push_back(Ok(vec![0x20, 0x02]));
        transport.reads.push_back(Err(NetError::Busy));
        transport.reads.push_back(Ok(vec![0x00, 0x00]));
        let s = section(None, None);
        let mut c = client(transport, &s);
        assert_eq!(c.connect(true), Ok(false));
    }

    #[test]
    fn busy_socket_connect_is_tolerated() {
        let mut transport = MockTransport::default();
        transport.connect_results.push_back(Err(NetError::Busy));
        transport.reads.push_back(Ok(CONNACK_OK.to_vec()));
        let s = section(None, None);
        let mut c = client(transport, &s);
        assert_eq!(c.connect(true), Ok(false));
    }

    #[test]
    fn reconnect_retries_until_a_connect_succeeds() {
        let mut transport = MockTransport::default();
        transport.connect_results.push_back(Err(NetError::Io));
        transport.connect_results.push_back(Err(NetError::Io));
        transport.connect_results.push_back(Ok(()));
        // Only the third attempt reaches the handshake.
        transport.reads.push_back(Ok(CONNACK_OK.to_vec()));
        let s = section(None, None);
        let mut c = client(transport, &s);
        c.reconnect();
        assert_eq!(c.transport.connects, 3);
    }

    #[test]
    fn unsupported_qos_is_rejected_before_any_io() {
        let s = section(None, None);
        let mut c = client(MockTransport::default(), &s);
        assert_eq!(
            c.publish("t", b"x", false, 2),
            Err(NetError::QosUnsupported(2))
        );
        assert!(c.transport.written.is_empty());
        assert_eq!(c.subscribe("t", 2), Err(NetError::QosUnsupported(2)));
    }

    #[test]
    fn publish_qos0_frame_layout() {
        let s = section(None, None);
        let mut c = client(MockTransport::default(), &s);
        c.publish("t", b"hi", true, 0).unwrap();
        assert_eq!(
            c.transport.written,
            vec![0x31, 0x05, 0x00, 0x01, b't', b'h', b'i']
        );
    }

    #[test]
    fn publish_qos1_waits_for_matching_puback() {
        let mut transport = MockTransport::default();
        transport.reads.push_back(Ok(vec![0x40, 0x02, 0x00, 0x01]));
        let s = section(None, None);
        let mut c = client(transport, &s);
        c.publish("t", b"hi", false, 1).unwrap();
        assert_eq!(
            c.transport.written,
            vec![0x32, 0x07, 0x00, 0x01, b't', 0x00, 0x01, b'h', b'i']
        );
    }

    #[test]
    fn publish_reconnects_after_a_dropped_connection() {
        let mut transport = MockTransport::default();
        // QoS 1 publish: the PUBACK read reports the peer gone, the
        // reconnect handshake succeeds, the resend gets its ack.
        transport.reads.push_back(Err(NetError::PeerClosed));
        transport.reads.push_back(Ok(CONNACK_OK.to_vec()));
        transport.reads.push_back(Ok(vec![0x40, 0x02, 0x00, 0x02]));
        let s = section(None, None);
        let mut c = client(transport, &s);
        c.publish("t", b"hi", false, 1).unwrap();
        assert_eq!(c.transport.connects, 1);
        // Two PUBLISH frames and one CONNECT frame were written.
        let publishes = c
            .transport
            .written
            .iter()
            .filter(|&&b| b == 0x32)
            .count();
        assert_eq!(publishes, 2);
    }

    #[test]
    fn check_msg_is_quiet_when_nothing_is_pending() {
        struct Recorder(Vec<(String, Vec<u8>)>);
        impl MessageHandler for Recorder {
            fn on_message(&mut self, topic: &str, payload: &[u8]) {
                self.0.push((topic.to_string(), payload.to_vec()));
            }
        }

        let s = section(None, None);
        let mut c = client(MockTransport::default(), &s);
        let mut handler = Recorder(Vec::new());
        c.check_msg(&mut handler);
        assert!(handler.0.is_empty());
        assert_eq!(c.transport.connects, 0);
    }

    #[test]
    fn check_msg_delivers_an_inbound_publish() {
        struct Recorder(Vec<(String, Vec<u8>)>);
        impl MessageHandler for Recorder {
            fn on_message(&mut self, topic: &str, payload: &[u8]) {
                self.0.push((topic.to_string(), payload.to_vec()));
            }
        }

        let mut transport = MockTransport::default();
        // PUBLISH qos0: topic "t", payload "on".
        transport.reads.push_back(Ok(vec![0x30, 0x05, 0x00, 0x01, b't', b'o', b'n']));
        let s = section(None, None);
        let mut c = client(transport, &s);
        let mut handler = Recorder(Vec::new());
        c.check_msg(&mut handler);
        assert_eq!(handler.0, vec![("t".to_string(), b"on".to_vec())]);
    }

    #[test]
    fn inbound_qos1_publish_is_acked() {
        struct Sink;
        impl MessageHandler for Sink {
            fn on_message(&mut self, _topic: &str, _payload: &[u8]) {}
        }

        let mut transport = MockTransport::default();
        // PUBLISH qos1 pid 7: topic "t", payload "x".
        transport
            .reads
            .push_back(Ok(vec![0x32, 0x06, 0x00, 0x01, b't', 0x00, 0x07, b'x']));
        let s = section(None, None);
        let mut c = client(transport, &s);
        c.check_msg(&mut Sink);
        assert_eq!(c.transport.written, vec![0x40, 0x02, 0x00, 0x07]);
    }

    #[test]
    fn bring_up_announces_and_subscribes() {
        struct Sink;
        impl MessageHandler for Sink {
            fn on_message(&mut self, _topic: &str, _payload: &[u8]) {}
        }

        let mut s = section(None, None);
        s.online = Some(MqttMessage {
            topic: "amp-01/status".into(),
            msg: "online".into(),
            retain: true,
            qos: 0,
        });
        s.subscribe.push(Subscription {
            topic: "amp-01/cmd".into(),
            qos: 0,
        });

        let mut transport = MockTransport::default();
        transport.reads.push_back(Ok(CONNACK_OK.to_vec()));
        // SUBACK for pid 1, granted qos 0; then nothing pending.
        transport.reads.push_back(Ok(vec![0x90, 0x03, 0x00, 0x01, 0x00]));
        let mut c = client(transport, &s);
        c.bring_up(&s, &mut Sink).unwrap();

        let written = &c.transport.written;
        // CONNECT, then retained online PUBLISH, then SUBSCRIBE.
        assert_eq!(written[0], 0x10);
        assert!(written.iter().any(|&b| b == 0x31));
        assert!(written.iter().any(|&b| b == 0x82));
    }
}
