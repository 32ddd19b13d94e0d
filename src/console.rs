use crate::bus::{Bus, BusError, SCAN_CAPACITY};
use crate::line::{Event, LineEditor};
use crate::menu::{Handler, Menu, Page, Route};
use crate::render::{Arg, render};
use crate::tokenize::{ArgTokens, HexPolicy, TokenError, hex_pair};
use crate::{ARG_CAPACITY, Error, NEWLINE, OUTBOUND_CAPACITY, PRINT_CAPACITY, PROMPT_SUFFIX};
use embassy_futures::yield_now;
use heapless::Vec;
use heapless::spsc::Consumer;

/// Erase from the cursor to the end of the line. Sent after a redrawn line when
/// [`ConsoleConfig::erase_on_redraw`] is set, so a shorter recalled line does
/// not leave the tail of the previous one on screen.
const ERASE_LINE: &[u8] = b"\x1b[K";

/// Byte sink the console output is drained into.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Sends one packet of at most [`OUTBOUND_CAPACITY`] bytes.
    ///
    /// Returns [`Error::Busy`] when the packet was not taken; the caller sends
    /// the same packet again.
    async fn transmit(&mut self, packet: &[u8]) -> Result<(), Error>;
}

/// Packet-sized staging queue in front of a [`Transport`].
pub struct Outbound<T> {
    transport: T,
    queue: Vec<u8, OUTBOUND_CAPACITY>,
}

impl<T: Transport> Outbound<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            queue: Vec::new(),
        }
    }

    pub fn transport(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Queues `bytes`, draining full packets to the transport as it goes.
    pub async fn write(&mut self, mut bytes: &[u8]) -> Result<(), Error> {
        while !bytes.is_empty() {
            if self.queue.is_full() {
                self.flush().await?;
            }
            let room = self.queue.capacity() - self.queue.len();
            let (head, rest) = bytes.split_at(room.min(bytes.len()));
            self.queue
                .extend_from_slice(head)
                .map_err(|_| Error::BufferOverflow)?;
            bytes = rest;
        }
        Ok(())
    }

    /// Renders `template` and queues the result.
    pub async fn print(&mut self, template: &str, args: &[Arg<'_>]) -> Result<(), Error> {
        let mut scratch = [0u8; PRINT_CAPACITY];
        let len = render(&mut scratch, template, args);
        self.write(&scratch[..len]).await
    }

    /// Sends whatever is queued, retrying while the transport is busy.
    pub async fn flush(&mut self) -> Result<(), Error> {
        if self.queue.is_empty() {
            return Ok(());
        }
        loop {
            match self.transport.transmit(&self.queue).await {
                Ok(()) => break,
                Err(Error::Busy) => yield_now().await,
                Err(e) => {
                    self.queue.clear();
                    return Err(e);
                }
            }
        }
        self.queue.clear();
        Ok(())
    }
}

pub struct ConsoleConfig {
    /// Characters that separate argument tokens.
    pub delimiters: &'static str,
    pub hex: HexPolicy,
    /// Sent once when a session starts, before the first prompt.
    pub banner: &'static str,
    /// Follow a history redraw with `ESC [ K`. Without it the redraw is just
    /// carriage return, prompt and line.
    pub erase_on_redraw: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            delimiters: " ,;",
            hex: HexPolicy::Strict,
            banner: "Pico bus console\r\nType 'h' for help\r\n",
            erase_on_redraw: true,
        }
    }
}

/// One console session: line editing, menu state and the buses it drives.
pub struct Console<T, I, S> {
    out: Outbound<T>,
    i2c: I,
    spi: S,
    editor: LineEditor,
    menu: Menu,
    args: ArgTokens,
    config: ConsoleConfig,
}

impl<T: Transport, I: Bus, S: Bus> Console<T, I, S> {
    pub fn new(transport: T, i2c: I, spi: S, config: ConsoleConfig) -> Self {
        Self {
            out: Outbound::new(transport),
            i2c,
            spi,
            editor: LineEditor::new(),
            menu: Menu::new(),
            args: ArgTokens::new(),
            config,
        }
    }

    pub fn page(&self) -> Page {
        self.menu.active()
    }

    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    pub fn editor(&self) -> &LineEditor {
        &self.editor
    }

    pub fn transport(&mut self) -> &mut T {
        self.out.transport()
    }

    pub fn i2c(&self) -> &I {
        &self.i2c
    }

    pub fn spi(&self) -> &S {
        &self.spi
    }

    /// Sends the banner and the first prompt.
    pub async fn start(&mut self) -> Result<(), Error> {
        self.out.write(self.config.banner.as_bytes()).await?;
        self.prompt().await?;
        self.out.flush().await
    }

    /// Drains the inbound queue and flushes the resulting output.
    pub async fn poll<const N: usize>(&mut self, inbound: &mut Consumer<'_, u8, N>) -> Result<(), Error> {
        while let Some(byte) = inbound.dequeue() {
            self.feed(byte).await?;
        }
        self.out.flush().await
    }

    /// Feeds a run of bytes and flushes the resulting output.
    pub async fn process_input(&mut self, data: &[u8]) -> Result<(), Error> {
        for &byte in data {
            self.feed(byte).await?;
        }
        self.out.flush().await
    }

    /// Handles one inbound byte. Output stays queued until the next flush.
    pub async fn feed(&mut self, byte: u8) -> Result<(), Error> {
        match self.editor.feed(byte) {
            Event::None => Ok(()),
            Event::Echo(byte) => self.out.write(&[byte]).await,
            Event::Submit(line) => {
                self.out.write(NEWLINE).await?;
                self.dispatch(line.as_str()).await?;
                self.prompt().await
            }
            Event::Prompt => {
                self.out.write(NEWLINE).await?;
                self.prompt().await
            }
            Event::Cancel => {
                self.menu.back();
                self.out.write(NEWLINE).await?;
                self.prompt().await
            }
            Event::Redraw => {
                self.out.write(b"\r").await?;
                self.prompt().await?;
                self.out.write(self.editor.buffer().as_bytes()).await?;
                if self.config.erase_on_redraw {
                    self.out.write(ERASE_LINE).await?;
                }
                Ok(())
            }
        }
    }

    async fn prompt(&mut self) -> Result<(), Error> {
        let page = self.menu.active();
        self.out
            .print("%s%s", &[page.name().into(), PROMPT_SUFFIX.into()])
            .await
    }

    async fn dispatch(&mut self, line: &str) -> Result<(), Error> {
        match self.menu.route(line) {
            Route::Ignored | Route::Navigated(_) => Ok(()),
            Route::Invoke {
                handler: Handler::Help,
                ..
            } => self.show_help().await,
            Route::Invoke { handler, arguments } => self.run_bus_command(handler, arguments).await,
        }
    }

    async fn show_help(&mut self) -> Result<(), Error> {
        let page = self.menu.active();
        self.out
            .print("----- %s HELP -----\r\n", &[page.name().into()])
            .await?;
        for command in page.commands() {
            self.out
                .print("%6s  %s\r\n", &[command.name.into(), command.help.into()])
                .await?;
        }
        self.out.write(b"--------------------\r\n").await
    }

    async fn run_bus_command(&mut self, handler: Handler, arguments: Option<&str>) -> Result<(), Error> {
        let page = self.menu.active();

        let payload: &[u8] = match arguments {
            Some(text) if handler.needs_arguments() => {
                match self.args.tokenize(text, self.config.delimiters, self.config.hex) {
                    Ok(0) => return Ok(()),
                    Ok(_) => self.args.as_slice(),
                    Err(e) => return report_token_error(&mut self.out, e).await,
                }
            }
            _ => &[],
        };

        let bus: &mut dyn Bus = match page {
            Page::I2c => &mut self.i2c,
            Page::Spi => &mut self.spi,
            _ => return Ok(()),
        };

        debug!("{} {}", page.name(), handler);
        execute(&mut self.out, bus, page, handler, payload).await
    }
}

async fn execute<T: Transport>(
    out: &mut Outbound<T>,
    bus: &mut dyn Bus,
    page: Page,
    handler: Handler,
    payload: &[u8],
) -> Result<(), Error> {
    match handler {
        Handler::SetAddress => {
            let Some(&address) = payload.first() else {
                return Ok(());
            };
            match bus.set_target_address(address) {
                Ok(()) => {
                    out.print("%s target address 0x%02X\r\n", &[page.name().into(), address.into()])
                        .await
                }
                Err(e) => report_bus_error(out, page, e).await,
            }
        }
        Handler::Write => match bus.write(payload) {
            Ok(()) => out.print("Wrote %u byte(s)\r\n", &[payload.len().into()]).await,
            Err(e) => report_bus_error(out, page, e).await,
        },
        Handler::WriteRead => {
            let mut data: Vec<u8, ARG_CAPACITY> = Vec::new();
            data.extend_from_slice(payload)
                .map_err(|_| Error::BufferOverflow)?;
            match bus.write_then_read(&mut data) {
                Ok(()) => dump(out, &data).await,
                Err(e) => report_bus_error(out, page, e).await,
            }
        }
        Handler::Read => {
            let Some(&count) = payload.first() else {
                return Ok(());
            };
            let mut data = [0u8; ARG_CAPACITY];
            let data = &mut data[..usize::from(count).min(ARG_CAPACITY)];
            match bus.read(data) {
                Ok(()) => dump(out, data).await,
                Err(e) => report_bus_error(out, page, e).await,
            }
        }
        Handler::Scan => {
            let mut found: Vec<u8, SCAN_CAPACITY> = Vec::new();
            match bus.scan_for_devices(&mut found) {
                Ok(()) => {
                    for &address in &found {
                        out.print("Found device at 0x%02X\r\n", &[address.into()]).await?;
                    }
                    out.print("%u device(s) found\r\n", &[found.len().into()]).await
                }
                Err(e) => report_bus_error(out, page, e).await,
            }
        }
        Handler::Help => Ok(()),
    }
}

async fn dump<T: Transport>(out: &mut Outbound<T>, bytes: &[u8]) -> Result<(), Error> {
    out.write(b"Read:").await?;
    for &byte in bytes {
        let [hi, lo] = hex_pair(byte);
        out.write(&[b' ', hi, lo]).await?;
    }
    out.write(NEWLINE).await
}

async fn report_bus_error<T: Transport>(out: &mut Outbound<T>, page: Page, e: BusError) -> Result<(), Error> {
    warn!("{} error: {}", page.name(), e);
    out.print("%s error: %s\r\n", &[page.name().into(), e.as_str().into()])
        .await
}

async fn report_token_error<T: Transport>(out: &mut Outbound<T>, e: TokenError<'_>) -> Result<(), Error> {
    warn!("rejected arguments: {}", e);
    match e {
        // The token can be longer than the render scratch buffer.
        TokenError::Malformed(token) => {
            out.write(b"Invalid argument '").await?;
            out.write(token.as_bytes()).await?;
            out.write(b"'\r\n").await
        }
        TokenError::TooMany => {
            out.print("Too many arguments (max %u)\r\n", &[ARG_CAPACITY.into()])
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::NoBus;
    use embassy_futures::block_on;

    #[derive(Default)]
    struct Capture {
        sent: std::vec::Vec<u8>,
        packets: usize,
        busy: usize,
        attempts: usize,
    }

    impl Transport for Capture {
        async fn transmit(&mut self, packet: &[u8]) -> Result<(), Error> {
            self.attempts += 1;
            assert!(packet.len() <= OUTBOUND_CAPACITY);
            if self.busy > 0 {
                self.busy -= 1;
                return Err(Error::Busy);
            }
            self.sent.extend_from_slice(packet);
            self.packets += 1;
            Ok(())
        }
    }

    struct Unplugged;

    impl Transport for Unplugged {
        async fn transmit(&mut self, _packet: &[u8]) -> Result<(), Error> {
            Err(Error::Disconnected)
        }
    }

    #[test]
    fn test_outbound_splits_into_packets() {
        let mut out = Outbound::new(Capture::default());
        let data: std::vec::Vec<u8> = (0..150u8).collect();
        block_on(async {
            out.write(&data).await.unwrap();
            out.flush().await.unwrap();
        });
        assert_eq!(out.transport().sent, data);
        assert_eq!(out.transport().packets, 3);
    }

    #[test]
    fn test_outbound_retries_busy() {
        let mut out = Outbound::new(Capture {
            busy: 5,
            ..Default::default()
        });
        block_on(async {
            out.write(b"hello").await.unwrap();
            out.flush().await.unwrap();
        });
        assert_eq!(out.transport().sent, b"hello");
        assert_eq!(out.transport().attempts, 6);
    }

    #[test]
    fn test_outbound_surfaces_disconnect() {
        let mut out = Outbound::new(Unplugged);
        let result = block_on(async {
            out.write(b"x").await?;
            out.flush().await
        });
        assert_eq!(result, Err(Error::Disconnected));
    }

    #[test]
    fn test_flush_with_nothing_queued() {
        let mut out = Outbound::new(Capture::default());
        block_on(out.flush()).unwrap();
        assert_eq!(out.transport().attempts, 0);
    }

    #[test]
    fn test_print_renders() {
        let mut out = Outbound::new(Capture::default());
        block_on(async {
            out.print("%s=%03u\r\n", &["n".into(), 7u8.into()]).await.unwrap();
            out.flush().await.unwrap();
        });
        assert_eq!(out.transport().sent, b"n=007\r\n");
    }

    #[test]
    fn test_poll_drains_queue() {
        let mut queue: heapless::spsc::Queue<u8, 16> = heapless::spsc::Queue::new();
        let (mut producer, mut consumer) = queue.split();
        for &byte in b"h\r" {
            producer.enqueue(byte).unwrap();
        }

        let mut console = Console::new(Capture::default(), NoBus, NoBus, ConsoleConfig::default());
        block_on(console.poll(&mut consumer)).unwrap();

        let sent = std::string::String::from_utf8(console.transport().sent.clone()).unwrap();
        assert!(sent.starts_with("h\r\n----- main HELP -----\r\n"));
        assert!(sent.ends_with("--------------------\r\nmain>"));
        assert!(consumer.dequeue().is_none());
    }
}
