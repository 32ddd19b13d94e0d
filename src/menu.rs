//! Menu pages, their command tables and page navigation.

/// A navigable menu context of the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Page {
    Main,
    Uart,
    I2c,
    Spi,
    Can,
}

impl Page {
    /// Name shown in the prompt.
    pub const fn name(self) -> &'static str {
        match self {
            Page::Main => "main",
            Page::Uart => "UART",
            Page::I2c => "I2C",
            Page::Spi => "SPI",
            Page::Can => "CAN",
        }
    }

    pub fn commands(self) -> &'static [Command] {
        match self {
            Page::Main => MAIN_COMMANDS,
            Page::I2c | Page::Spi => BUS_COMMANDS,
            Page::Uart | Page::Can => PORT_COMMANDS,
        }
    }

    /// Whether lines on this page are split into `command=arguments`.
    pub const fn takes_arguments(self) -> bool {
        matches!(self, Page::I2c | Page::Spi)
    }
}

/// Built-in operations a command can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Handler {
    Help,
    SetAddress,
    Write,
    WriteRead,
    Read,
    Scan,
}

impl Handler {
    /// Handlers that do nothing without an `=arguments` part.
    pub const fn needs_arguments(self) -> bool {
        matches!(
            self,
            Handler::SetAddress | Handler::Write | Handler::WriteRead | Handler::Read
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Navigate(Page),
    Invoke(Handler),
}

pub struct Command {
    pub name: &'static str,
    pub help: &'static str,
    pub action: Action,
}

pub static MAIN_COMMANDS: &[Command] = &[
    Command {
        name: "help",
        help: "Show available commands",
        action: Action::Invoke(Handler::Help),
    },
    Command {
        name: "h",
        help: "Show available commands",
        action: Action::Invoke(Handler::Help),
    },
    Command {
        name: "?",
        help: "Show available commands",
        action: Action::Invoke(Handler::Help),
    },
    Command {
        name: "i",
        help: "Enter the I2C page",
        action: Action::Navigate(Page::I2c),
    },
    Command {
        name: "I2C",
        help: "Enter the I2C page",
        action: Action::Navigate(Page::I2c),
    },
    Command {
        name: "i2c",
        help: "Enter the I2C page",
        action: Action::Navigate(Page::I2c),
    },
    Command {
        name: "s",
        help: "Enter the SPI page",
        action: Action::Navigate(Page::Spi),
    },
    Command {
        name: "SPI",
        help: "Enter the SPI page",
        action: Action::Navigate(Page::Spi),
    },
    Command {
        name: "spi",
        help: "Enter the SPI page",
        action: Action::Navigate(Page::Spi),
    },
    Command {
        name: "u",
        help: "Enter the UART page",
        action: Action::Navigate(Page::Uart),
    },
    Command {
        name: "c",
        help: "Enter the CAN page",
        action: Action::Navigate(Page::Can),
    },
];

pub static BUS_COMMANDS: &[Command] = &[
    Command {
        name: "h",
        help: "Show available commands",
        action: Action::Invoke(Handler::Help),
    },
    Command {
        name: "addr",
        help: "Set target address: addr=<hex>",
        action: Action::Invoke(Handler::SetAddress),
    },
    Command {
        name: "w",
        help: "Write bytes: w=<bytes>",
        action: Action::Invoke(Handler::Write),
    },
    Command {
        name: "wr",
        help: "Write bytes, read as many back: wr=<bytes>",
        action: Action::Invoke(Handler::WriteRead),
    },
    Command {
        name: "r",
        help: "Read n bytes: r=<n>",
        action: Action::Invoke(Handler::Read),
    },
    Command {
        name: "scan",
        help: "Probe the bus for devices",
        action: Action::Invoke(Handler::Scan),
    },
];

pub static PORT_COMMANDS: &[Command] = &[Command {
    name: "h",
    help: "Show available commands",
    action: Action::Invoke(Handler::Help),
}];

/// What a submitted line resolved to.
#[derive(Debug, PartialEq, Eq)]
pub enum Route<'l> {
    /// No command matched, or a required argument was missing.
    Ignored,
    Navigated(Page),
    Invoke {
        handler: Handler,
        arguments: Option<&'l str>,
    },
}

/// Active page plus a single "previous page" slot.
///
/// Going back re-enters the recorded page through the normal navigation path,
/// which only updates the slot when the target differs from it. That gives one
/// level of back navigation, not a stack: MAIN -> I2C -> SPI -> back lands on
/// I2C, and a second back stays there.
pub struct Menu {
    active: Page,
    previous: Page,
}

impl Default for Menu {
    fn default() -> Self {
        Self::new()
    }
}

impl Menu {
    pub const fn new() -> Self {
        Self {
            active: Page::Main,
            previous: Page::Main,
        }
    }

    pub fn active(&self) -> Page {
        self.active
    }

    pub fn previous(&self) -> Page {
        self.previous
    }

    pub fn goto(&mut self, page: Page) {
        if page != self.previous {
            self.previous = self.active;
        }
        self.active = page;
        info!("page -> {}", page.name());
    }

    pub fn back(&mut self) {
        self.goto(self.previous);
    }

    /// Exact, case-sensitive lookup in the active page's table.
    pub fn lookup(&self, token: &str) -> Option<&'static Command> {
        self.active.commands().iter().find(|cmd| cmd.name == token)
    }

    /// Resolves `line` against the active page, performing navigation.
    pub fn route<'l>(&mut self, line: &'l str) -> Route<'l> {
        let (token, arguments) = if self.active.takes_arguments() {
            match line.split_once('=') {
                Some((token, rest)) => (token, Some(rest).filter(|rest| !rest.is_empty())),
                None => (line, None),
            }
        } else {
            (line, None)
        };

        let Some(command) = self.lookup(token) else {
            debug!("no command '{}' on {}", token, self.active.name());
            return Route::Ignored;
        };

        match command.action {
            Action::Navigate(page) => {
                self.goto(page);
                Route::Navigated(page)
            }
            Action::Invoke(handler) if handler.needs_arguments() && arguments.is_none() => {
                Route::Ignored
            }
            Action::Invoke(handler) => Route::Invoke { handler, arguments },
        }
    }
}
