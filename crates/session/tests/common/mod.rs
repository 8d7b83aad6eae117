//! Scripted link for session tests

#![allow(dead_code, unreachable_pub)]

use cardreader_apdu_core::TransportError;
use cardreader_session::{Link, LinkClose, LinkOpen, ReaderChannel};
use hex_literal::hex;

/// How a [`ScriptedLink`] answers `open`
#[derive(Debug)]
pub enum OpenScript {
    /// Ready at once with this channel and reader name
    Ready(Option<ReaderChannel>, &'static str),
    /// Completion arrives later as a link event
    Pending,
    /// Open fails
    Fail,
}

/// Link answering `open` from a script and counting calls
#[derive(Debug)]
pub struct ScriptedLink {
    pub script: OpenScript,
    pub close_result: LinkClose,
    pub opened: Vec<String>,
    pub closes: usize,
    pub notifications: bool,
}

impl ScriptedLink {
    pub fn ready(channel: ReaderChannel, reader_name: &'static str) -> Self {
        Self::new(OpenScript::Ready(Some(channel), reader_name))
    }

    pub fn new(script: OpenScript) -> Self {
        Self {
            script,
            close_result: LinkClose::Closed,
            opened: Vec::new(),
            closes: 0,
            notifications: false,
        }
    }

    /// Answer `close` with [`LinkClose::Pending`]
    pub fn closing_later(mut self) -> Self {
        self.close_result = LinkClose::Pending;
        self
    }
}

impl Link for ScriptedLink {
    fn open(&mut self, address: &str) -> Result<LinkOpen, TransportError> {
        self.opened.push(address.to_string());
        match &mut self.script {
            OpenScript::Ready(channel, reader_name) => match channel.take() {
                Some(channel) => Ok(LinkOpen::Ready {
                    channel,
                    reader_name: reader_name.to_string(),
                }),
                None => Err(TransportError::Connection),
            },
            OpenScript::Pending => Ok(LinkOpen::Pending),
            OpenScript::Fail => Err(TransportError::Connection),
        }
    }

    fn close(&mut self) -> Result<LinkClose, TransportError> {
        self.closes += 1;
        Ok(self.close_result)
    }

    fn requires_notifications(&self) -> bool {
        self.notifications
    }
}

/// READ PROFILE response of a Taiwan health card, status word included
pub fn taiwan_profile() -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(b"000012345678");
    data.extend_from_slice(&hex!("A4FDA470A9FA"));
    data.extend_from_slice(&[0u8; 14]);
    data.extend_from_slice(b"A123456789");
    data.extend_from_slice(b"0750312");
    data.push(b'M');
    data.extend_from_slice(b"1120101");
    data.extend_from_slice(&hex!("9000"));
    data
}
