named_codes! {
    /// BACnet object types. Values without a standard mapping (including the
    /// vendor range 128–1023) become [`Proprietary`](Self::Proprietary).
    pub enum ObjectType: u16, Proprietary, to_u16, from_u16 {
        AnalogInput = 0 => "analog-input",
        AnalogOutput = 1 => "analog-output",
        AnalogValue = 2 => "analog-value",
        BinaryInput = 3 => "binary-input",
        BinaryOutput = 4 => "binary-output",
        BinaryValue = 5 => "binary-value",
        Calendar = 6 => "calendar",
        Command = 7 => "command",
        Device = 8 => "device",
        EventEnrollment = 9 => "event-enrollment",
        File = 10 => "file",
        Group = 11 => "group",
        Loop = 12 => "loop",
        MultiStateInput = 13 => "multi-state-input",
        MultiStateOutput = 14 => "multi-state-output",
        NotificationClass = 15 => "notification-class",
        Program = 16 => "program",
        Schedule = 17 => "schedule",
        Averaging = 18 => "averaging",
        MultiStateValue = 19 => "multi-state-value",
        TrendLog = 20 => "trend-log",
        LifeSafetyPoint = 21 => "life-safety-point",
        LifeSafetyZone = 22 => "life-safety-zone",
        Accumulator = 23 => "accumulator",
        PulseConverter = 24 => "pulse-converter",
        EventLog = 25 => "event-log",
        GlobalGroup = 26 => "global-group",
        TrendLogMultiple = 27 => "trend-log-multiple",
        LoadControl = 28 => "load-control",
        StructuredView = 29 => "structured-view",
        AccessDoor = 30 => "access-door",
        CharacterStringValue = 40 => "characterstring-value",
        IntegerValue = 45 => "integer-value",
        LargeAnalogValue = 46 => "large-analog-value",
        PositiveIntegerValue = 48 => "positive-integer-value",
        NetworkPort = 56 => "network-port",
    }
}

impl ObjectType {
    /// Object types whose present-value is arbitrated through a priority array.
    pub const fn is_commandable(self) -> bool {
        matches!(
            self,
            Self::AnalogOutput
                | Self::AnalogValue
                | Self::BinaryOutput
                | Self::BinaryValue
                | Self::MultiStateOutput
                | Self::MultiStateValue
                | Self::CharacterStringValue
                | Self::IntegerValue
                | Self::LargeAnalogValue
                | Self::PositiveIntegerValue
        )
    }
}
