#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::block::ImageDef;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::i2c::{self, I2c};
use embassy_rp::peripherals::{I2C0, SPI0, USB};
use embassy_rp::spi::{self, Spi};
use embassy_rp::usb::Driver;
use embassy_time::{Duration, Timer};
use embassy_usb::UsbDevice;
use embassy_usb::class::cdc_acm::{Receiver, State};
use heapless::spsc::{Consumer, Producer, Queue};
use pico_bus_console::board::{I2cBus, SpiBus};
use pico_bus_console::usb::{UsbTransport, pump_inbound, setup_usb};
use pico_bus_console::{Console, ConsoleConfig, INBOUND_QUEUE};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

#[unsafe(link_section = ".start_block")]
#[used]
pub static IMAGE_DEF: ImageDef = ImageDef::secure_exe();

#[unsafe(link_section = ".bi_entries")]
#[used]
pub static PICOTOOL_ENTRIES: [embassy_rp::binary_info::EntryAddr; 4] = [
    embassy_rp::binary_info::rp_program_name!(c"Pico bus console"),
    embassy_rp::binary_info::rp_program_description!(c"I2C/SPI command console over USB serial"),
    embassy_rp::binary_info::rp_cargo_version!(),
    embassy_rp::binary_info::rp_program_build_attribute!(),
];

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const I2C_FREQUENCY: u32 = 100_000;
const SPI_FREQUENCY: u32 = 1_000_000;

type UsbDriver = Driver<'static, USB>;
type BoardConsole = Console<UsbTransport<'static>, I2cBus<'static, I2C0>, SpiBus<'static, SPI0>>;

#[embassy_executor::task]
async fn usb_task(mut usb: UsbDevice<'static, UsbDriver>) -> ! {
    usb.run().await
}

#[embassy_executor::task]
async fn reader_task(
    mut receiver: Receiver<'static, UsbDriver>,
    mut inbound: Producer<'static, u8, INBOUND_QUEUE>,
) -> ! {
    loop {
        receiver.wait_connection().await;
        let e = pump_inbound(&mut receiver, &mut inbound).await;
        warn!("USB receive stopped: {}", e);
    }
}

#[embassy_executor::task]
async fn console_task(mut console: BoardConsole, mut inbound: Consumer<'static, u8, INBOUND_QUEUE>) -> ! {
    loop {
        console.transport().wait_connection().await;
        if let Err(e) = console.start().await {
            warn!("Failed to send welcome: {}", e);
            continue;
        }

        loop {
            if let Err(e) = console.poll(&mut inbound).await {
                warn!("Console session ended: {}", e);
                break;
            }
            Timer::after(POLL_INTERVAL).await;
        }
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());
    info!("Pico bus console v{}", env!("CARGO_PKG_VERSION"));

    static STATE: StaticCell<State> = StaticCell::new();
    static CONFIG_DESC: StaticCell<[u8; 256]> = StaticCell::new();
    static BOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
    static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();

    let (builder, class) = setup_usb(
        p.USB,
        STATE.init(State::new()),
        CONFIG_DESC.init([0; 256]),
        BOS_DESC.init([0; 256]),
        CONTROL_BUF.init([0; 64]),
    );
    let usb = builder.build();
    let (sender, receiver) = class.split();

    static INBOUND: StaticCell<Queue<u8, INBOUND_QUEUE>> = StaticCell::new();
    let (producer, consumer) = INBOUND.init(Queue::new()).split();

    let mut i2c_config = i2c::Config::default();
    i2c_config.frequency = I2C_FREQUENCY;
    let i2c = I2c::new_blocking(p.I2C0, p.PIN_5, p.PIN_4, i2c_config);

    let mut spi_config = spi::Config::default();
    spi_config.frequency = SPI_FREQUENCY;
    let spi = Spi::new_blocking(p.SPI0, p.PIN_18, p.PIN_19, p.PIN_16, spi_config);
    let cs = Output::new(p.PIN_17, Level::High);

    let console = Console::new(
        UsbTransport::new(sender),
        I2cBus::new(i2c),
        SpiBus::new(spi, cs),
        ConsoleConfig::default(),
    );

    unwrap!(spawner.spawn(usb_task(usb)));
    unwrap!(spawner.spawn(reader_task(receiver, producer)));
    unwrap!(spawner.spawn(console_task(console, consumer)));
}
