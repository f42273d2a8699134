#![allow(dead_code)]

use solaredge_bridge::config::{Config, ConfigWrapper, Influx, Inverter};
use solaredge_bridge::decoder::{RegisterBlock, BLOCK_LENGTH};

/// Register indexes within the fetched block, counted from the block start
/// at 40069.
pub const AC_TOTAL_CURRENT: usize = 2;
pub const AC_CURRENT_A: usize = 3;
pub const AC_CURRENT_B: usize = 4;
pub const AC_CURRENT_C: usize = 5;
pub const AC_CURRENT_SF: usize = 6;
pub const AC_VOLTAGE_A: usize = 10;
pub const AC_VOLTAGE_B: usize = 11;
pub const AC_VOLTAGE_C: usize = 12;
pub const AC_VOLTAGE_SF: usize = 13;
pub const AC_POWER: usize = 14;
pub const AC_POWER_SF: usize = 15;
pub const LIFETIME_HI: usize = 24;
pub const LIFETIME_LO: usize = 25;
pub const LIFETIME_SF: usize = 26;
pub const DC_CURRENT: usize = 27;
pub const DC_CURRENT_SF: usize = 28;
pub const DC_VOLTAGE: usize = 29;
pub const DC_VOLTAGE_SF: usize = 30;
pub const DC_POWER: usize = 31;
pub const DC_POWER_SF: usize = 32;

pub fn common_setup() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub struct Factory;

impl Factory {
    /// A full-length block of zero readings with every scale factor zero.
    pub fn registers() -> Vec<u16> {
        vec![0u16; BLOCK_LENGTH]
    }

    pub fn block() -> RegisterBlock {
        RegisterBlock::new(Self::registers())
    }

    /// A baseline block with the given registers overridden.
    pub fn block_with(edits: &[(usize, u16)]) -> RegisterBlock {
        let mut registers = Self::registers();
        for (index, value) in edits {
            registers[*index] = *value;
        }
        RegisterBlock::new(registers)
    }

    pub fn config() -> Config {
        Config {
            inverter: Inverter {
                host: "127.0.0.1".to_string(),
                port: 502,
                unit_id: 1,
                read_timeout: Some(1),
            },
            influx: Influx {
                enabled: true,
                host: "localhost".to_string(),
                port: 8086,
                username: None,
                password: None,
                database: "solaredge".to_string(),
            },
            period: 1,
            loglevel: "debug".to_string(),
        }
    }

    pub fn config_wrapper() -> ConfigWrapper {
        ConfigWrapper::from_config(Self::config())
    }
}
