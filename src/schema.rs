//! Register and advertisement field layouts for the 2JCIE-BU01.
//!
//! Every payload the sensor produces or accepts is described by a
//! [`Schema`]: an ordered list of fields with fixed little-endian widths and
//! decimal scale divisors, straight out of the OMRON communication
//! interface manual. Schemas are defined once as static tables and looked
//! up by register address or advertisement datatype; nothing here is
//! configurable at runtime.

use std::sync::LazyLock;

/// Wire type of a single field, all little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    UInt8,
    UInt16,
    SInt16,
    UInt32,
    SInt32,
}

impl Primitive {
    /// Encoded width in bytes.
    pub const fn width(self) -> usize {
        match self {
            Primitive::UInt8 => 1,
            Primitive::UInt16 | Primitive::SInt16 => 2,
            Primitive::UInt32 | Primitive::SInt32 => 4,
        }
    }
}

/// A named field within a register or advertisement payload.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub primitive: Primitive,
    /// Divisor applied to the raw integer on decode (1, 10, 100 or 1000).
    pub divisor: u32,
    pub unit: &'static str,
}

/// One entry in a schema: either a named value or reserved padding.
#[derive(Debug, Clone, Copy)]
pub enum Field {
    Value(FieldSpec),
    /// Padding bytes with no semantic value; zero-filled on encode,
    /// skipped on decode.
    Reserved { width: usize },
}

impl Field {
    pub const fn width(&self) -> usize {
        match self {
            Field::Value(spec) => spec.primitive.width(),
            Field::Reserved { width } => *width,
        }
    }
}

/// An ordered field layout identified by a register address or an
/// advertisement datatype.
#[derive(Debug)]
pub struct Schema {
    pub name: &'static str,
    pub fields: Vec<Field>,
}

impl Schema {
    fn new(name: &'static str, parts: &[&[Field]]) -> Self {
        Schema {
            name,
            fields: parts.concat(),
        }
    }

    /// Total encoded width in bytes, reserved padding included.
    pub fn width(&self) -> usize {
        self.fields.iter().map(Field::width).sum()
    }

    /// Whether `name` is one of the named (non-reserved) fields.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|field| match field {
            Field::Value(spec) => spec.name == name,
            Field::Reserved { .. } => false,
        })
    }
}

/// Which half of an advertisement cycle a schema describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvRole {
    /// Complete in a single packet (passive scan).
    Simple,
    /// First half of a split cycle, carries the sensing fields.
    Indication,
    /// Second half of a split cycle, carries the calculation fields.
    Response,
}

const fn field(
    name: &'static str,
    description: &'static str,
    primitive: Primitive,
    divisor: u32,
    unit: &'static str,
) -> Field {
    Field::Value(FieldSpec {
        name,
        description,
        primitive,
        divisor,
        unit,
    })
}

use Primitive::{SInt16, SInt32, UInt8, UInt16, UInt32};

static ADV_TYPE: &[Field] = &[field("type", "Data type", UInt8, 1, "")];
static SEQ: &[Field] = &[field("seq", "Sequence number", UInt8, 1, "")];

static SENSING: &[Field] = &[
    field("temperature", "Temperature", SInt16, 100, "degC"),
    field("humidity", "Relative humidity", SInt16, 100, "%RH"),
    field("light", "Ambient light", SInt16, 1, "lx"),
    field("pressure", "Barometric pressure", SInt32, 1000, "hPa"),
    field("noise", "Sound noise", SInt16, 100, "dB"),
    field("eTVOC", "eTVOC", SInt16, 1, "ppb"),
    field("eCO2", "eCO2", SInt16, 1, "ppm"),
];

static CALCULATION: &[Field] = &[
    field("thi", "Discomfort index; THI", SInt16, 100, ""),
    field("wbgt", "Heat stroke; WBGT", SInt16, 100, "degC"),
    field("vibration", "Vibration information", UInt8, 1, ""),
    field("si", "SI value", UInt16, 10, "kine"),
    field("pga", "PGA", UInt16, 10, "gal"),
    field("seismic_intensity", "Seismic intensity", UInt16, 1000, ""),
];

static ACCELERATION: &[Field] = &[
    field("acc_x", "Acceleration (X-axis)", SInt16, 10, "gal"),
    field("acc_y", "Acceleration (Y-axis)", SInt16, 10, "gal"),
    field("acc_z", "Acceleration (Z-axis)", SInt16, 10, "gal"),
];

static SENSING_FLAGS: &[Field] = &[
    field("f_temperature", "Temperature flag", UInt16, 1, ""),
    field("f_humidity", "Relative humidity flag", UInt16, 1, ""),
    field("f_light", "Ambient light flag", UInt16, 1, ""),
    field("f_pressure", "Barometric pressure flag", UInt16, 1, ""),
    field("f_noise", "Sound noise flag", UInt16, 1, ""),
    field("f_eTVOC", "eTVOC flag", UInt16, 1, ""),
    field("f_eCO2", "eCO2 flag", UInt16, 1, ""),
];

static CALCULATION_FLAGS: &[Field] = &[
    field("f_thi", "Discomfort index flag; THI", UInt16, 1, ""),
    field("f_wbgt", "Heat stroke flag; WBGT", UInt16, 1, ""),
    field("f_si", "SI value flag", UInt8, 1, ""),
    field("f_pga", "PGA flag", UInt8, 1, ""),
    field("f_seismic_intensity", "Seismic intensity flag", UInt8, 1, ""),
];

/// 4.4.2 Latest sensing data (address 0x5012).
pub const LATEST_SENSING_DATA: u16 = 0x5012;
/// 4.4.2 Latest calculation data (address 0x5013).
pub const LATEST_CALCULATION_DATA: u16 = 0x5013;
/// 4.4.3 Latest data long (address 0x5021).
pub const LATEST_DATA_LONG: u16 = 0x5021;
/// 4.5.7 Vibration count (address 0x5031).
pub const VIBRATION_COUNT: u16 = 0x5031;
/// 4.5.8 LED setting, normal state (address 0x5111).
pub const LED_SETTING: u16 = 0x5111;
/// 4.5.12 Advertise setting (address 0x5115).
pub const ADVERTISE_SETTING: u16 = 0x5115;
/// 4.5.25 Device information (address 0x180a), fixed-width text payload
/// parsed by [`crate::codec::decode_device_info`] rather than a schema.
pub const DEVICE_INFORMATION: u16 = 0x180a;

static LATEST_SENSING_DATA_SCHEMA: LazyLock<Schema> =
    LazyLock::new(|| Schema::new("latest_sensing_data", &[SEQ, SENSING]));

static LATEST_CALCULATION_DATA_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new("latest_calculation_data", &[SEQ, CALCULATION, ACCELERATION])
});

static LATEST_DATA_LONG_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(
        "latest_data_long",
        &[SEQ, SENSING, CALCULATION, SENSING_FLAGS, CALCULATION_FLAGS],
    )
});

static VIBRATION_COUNT_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(
        "vibration_count",
        &[&[
            field("earthquake", "Earthquake count", UInt32, 1, ""),
            field("vibration", "Vibration count", UInt32, 1, ""),
        ]],
    )
});

static LED_SETTING_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(
        "led_setting",
        &[&[
            field("rule", "Display rule (normal state)", UInt16, 1, ""),
            field("red", "Intensity of LED (Red)", UInt8, 1, ""),
            field("green", "Intensity of LED (Green)", UInt8, 1, ""),
            field("blue", "Intensity of LED (Blue)", UInt8, 1, ""),
        ]],
    )
});

static ADVERTISE_SETTING_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(
        "advertise_setting",
        &[&[
            field("interval", "Advertising interval", UInt16, 1, ""),
            field("mode", "Advertising mode", UInt8, 1, ""),
        ]],
    )
});

static SCAN_PASSIVE_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(
        "scan_passive",
        &[ADV_TYPE, SEQ, SENSING, &[Field::Reserved { width: 1 }]],
    )
});

static SCAN_ACTIVE_IND_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(
        "scan_active_ind",
        &[ADV_TYPE, SEQ, SENSING, &[Field::Reserved { width: 1 }]],
    )
});

static SCAN_ACTIVE_RSP_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(
        "scan_active_rsp",
        &[
            ADV_TYPE,
            SEQ,
            CALCULATION,
            ACCELERATION,
            &[Field::Reserved { width: 8 }],
        ],
    )
});

/// Look up the layout of a serial register or GATT characteristic.
///
/// Returns `None` for addresses this crate has no table for; callers are
/// expected to pass the raw payload through untouched in that case.
pub fn schema_for_address(address: u16) -> Option<&'static Schema> {
    match address {
        LATEST_SENSING_DATA => Some(&LATEST_SENSING_DATA_SCHEMA),
        LATEST_CALCULATION_DATA => Some(&LATEST_CALCULATION_DATA_SCHEMA),
        LATEST_DATA_LONG => Some(&LATEST_DATA_LONG_SCHEMA),
        VIBRATION_COUNT => Some(&VIBRATION_COUNT_SCHEMA),
        LED_SETTING => Some(&LED_SETTING_SCHEMA),
        ADVERTISE_SETTING => Some(&ADVERTISE_SETTING_SCHEMA),
        _ => None,
    }
}

/// Advertisement datatype 0x01: sensor data, broadcast in one packet.
pub const ADV_SENSOR_DATA: u8 = 0x01;
/// Advertisement datatype 0x03: sensor data plus calculation data, split
/// across an indication and a scan-response packet.
pub const ADV_SENSOR_AND_CALCULATION: u8 = 0x03;

/// Total length of the indication half of a split advertisement.
pub const INDICATION_LEN: usize = 19;
/// Total length of the scan-response half of a split advertisement.
pub const RESPONSE_LEN: usize = 27;

/// Look up the layout of an advertisement payload by datatype and total
/// packet length. For split datatypes the length selects the half.
pub fn schema_for_advertisement(
    datatype: u8,
    total_len: usize,
) -> Option<(AdvRole, &'static Schema)> {
    match (datatype, total_len) {
        (ADV_SENSOR_DATA, INDICATION_LEN) => Some((AdvRole::Simple, &SCAN_PASSIVE_SCHEMA)),
        (ADV_SENSOR_AND_CALCULATION, INDICATION_LEN) => {
            Some((AdvRole::Indication, &SCAN_ACTIVE_IND_SCHEMA))
        }
        (ADV_SENSOR_AND_CALCULATION, RESPONSE_LEN) => {
            Some((AdvRole::Response, &SCAN_ACTIVE_RSP_SCHEMA))
        }
        _ => None,
    }
}
