use crate::{Error, Transport};
use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::USB;
use embassy_rp::usb::{Driver, InterruptHandler};
use embassy_time::{Duration, Timer, with_timeout};
use embassy_usb::class::cdc_acm::{CdcAcmClass, Receiver, Sender, State};
use embassy_usb::driver::EndpointError;
use embassy_usb::{Builder, Config};
use heapless::spsc::Producer;

pub const MAX_PACKET_SIZE: u16 = 64;

/// How long a packet may wait for the host before it counts as busy.
const TX_TIMEOUT: Duration = Duration::from_millis(50);

// Bind USB interrupts
bind_interrupts!(struct Irqs {
    USBCTRL_IRQ => InterruptHandler<USB>;
});

/// Handles conversion of USB endpoint errors to our Error type
impl From<EndpointError> for Error {
    fn from(val: EndpointError) -> Self {
        match val {
            EndpointError::BufferOverflow => Error::BufferOverflow,
            EndpointError::Disabled => Error::Disconnected,
        }
    }
}

/// Initializes the USB CDC ACM (serial) device
pub fn setup_usb<'d>(
    usb_peripheral: USB,
    state: &'d mut State<'d>,
    config_desc: &'d mut [u8; 256],
    bos_desc: &'d mut [u8; 256],
    control_buf: &'d mut [u8; 64],
) -> (
    Builder<'d, Driver<'d, USB>>,
    CdcAcmClass<'d, Driver<'d, USB>>,
) {
    let driver = Driver::new(usb_peripheral, Irqs);

    // Configure USB device
    let mut config = Config::new(0xc0de, 0xcafe);
    config.manufacturer = Some("Pico OS");
    config.product = Some("Bus Console");
    config.serial_number = Some("123456");
    config.max_packet_size_0 = 64;

    // Create USB builder
    let mut builder = Builder::new(
        driver,
        config,
        config_desc,
        bos_desc,
        &mut [],
        control_buf,
    );

    // Create CDC ACM class
    let class = CdcAcmClass::new(&mut builder, state, MAX_PACKET_SIZE);

    (builder, class)
}

/// Console output side of the CDC ACM class.
pub struct UsbTransport<'d> {
    sender: Sender<'d, Driver<'d, USB>>,
}

impl<'d> UsbTransport<'d> {
    pub fn new(sender: Sender<'d, Driver<'d, USB>>) -> Self {
        Self { sender }
    }

    /// Waits until the host has configured the device and opened the port.
    pub async fn wait_connection(&mut self) {
        self.sender.wait_connection().await;
        while !self.sender.dtr() {
            Timer::after(Duration::from_millis(10)).await;
        }
        debug!("host connected");
    }
}

impl Transport for UsbTransport<'_> {
    async fn transmit(&mut self, packet: &[u8]) -> Result<(), Error> {
        match with_timeout(TX_TIMEOUT, self.sender.write_packet(packet)).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(Error::Busy),
        }
    }
}

/// Moves received bytes into the console's inbound queue until the port closes.
///
/// Never blocks on the queue: bytes that do not fit are dropped.
pub async fn pump_inbound<const N: usize>(
    receiver: &mut Receiver<'_, Driver<'_, USB>>,
    inbound: &mut Producer<'_, u8, N>,
) -> Error {
    let mut read_buf = [0; MAX_PACKET_SIZE as usize];

    loop {
        match receiver.read_packet(&mut read_buf).await {
            Ok(n) => {
                for &byte in &read_buf[..n] {
                    if inbound.enqueue(byte).is_err() {
                        warn!("inbound queue full, dropped byte {=u8:#x}", byte);
                    }
                }
            }
            Err(e) => return e.into(),
        }
    }
}
