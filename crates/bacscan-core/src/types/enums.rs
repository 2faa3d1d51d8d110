named_codes! {
    /// Segmentation capability advertised in I-Am.
    pub enum Segmentation: u32, Unknown, to_u32, from_u32 {
        SegmentedBoth = 0 => "segmented-both",
        SegmentedTransmit = 1 => "segmented-transmit",
        SegmentedReceive = 2 => "segmented-receive",
        NoSegmentation = 3 => "no-segmentation",
    }
}

/// Max-APDU code carried in the confirmed request header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxApdu {
    UpTo50,
    UpTo128,
    UpTo206,
    UpTo480,
    UpTo1024,
    UpTo1476,
}

impl MaxApdu {
    pub const fn code(self) -> u8 {
        match self {
            Self::UpTo50 => 0,
            Self::UpTo128 => 1,
            Self::UpTo206 => 2,
            Self::UpTo480 => 3,
            Self::UpTo1024 => 4,
            Self::UpTo1476 => 5,
        }
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::UpTo50),
            1 => Some(Self::UpTo128),
            2 => Some(Self::UpTo206),
            3 => Some(Self::UpTo480),
            4 => Some(Self::UpTo1024),
            5 => Some(Self::UpTo1476),
            _ => None,
        }
    }

    pub const fn octets(self) -> u32 {
        match self {
            Self::UpTo50 => 50,
            Self::UpTo128 => 128,
            Self::UpTo206 => 206,
            Self::UpTo480 => 480,
            Self::UpTo1024 => 1024,
            Self::UpTo1476 => 1476,
        }
    }
}

named_codes! {
    pub enum ErrorClass: u32, Vendor, to_u32, from_u32 {
        Device = 0 => "device",
        Object = 1 => "object",
        Property = 2 => "property",
        Resources = 3 => "resources",
        Security = 4 => "security",
        Services = 5 => "services",
        Vt = 6 => "vt",
        Communication = 7 => "communication",
    }
}

named_codes! {
    pub enum ErrorCode: u32, Vendor, to_u32, from_u32 {
        Other = 0 => "other",
        ConfigurationInProgress = 2 => "configuration-in-progress",
        DeviceBusy = 3 => "device-busy",
        InconsistentParameters = 7 => "inconsistent-parameters",
        InvalidDataType = 9 => "invalid-data-type",
        MissingRequiredParameter = 16 => "missing-required-parameter",
        NoSpaceToWriteProperty = 20 => "no-space-to-write-property",
        PasswordFailure = 26 => "password-failure",
        PropertyIsNotAList = 22 => "property-is-not-a-list",
        ReadAccessDenied = 27 => "read-access-denied",
        ServiceRequestDenied = 29 => "service-request-denied",
        Timeout = 30 => "timeout",
        UnknownObject = 31 => "unknown-object",
        UnknownProperty = 32 => "unknown-property",
        UnsupportedObjectType = 36 => "unsupported-object-type",
        ValueOutOfRange = 37 => "value-out-of-range",
        WriteAccessDenied = 40 => "write-access-denied",
        InvalidArrayIndex = 42 => "invalid-array-index",
        PropertyIsNotAnArray = 50 => "property-is-not-an-array",
        OptionalFunctionalityNotSupported = 45 => "optional-functionality-not-supported",
        AbortSegmentationNotSupported = 121 => "abort-segmentation-not-supported",
    }
}

named_codes! {
    /// Reasons carried by a Reject PDU.
    pub enum RejectReason: u8, Other, to_u8, from_u8 {
        Unspecified = 0 => "other",
        BufferOverflow = 1 => "buffer-overflow",
        InconsistentParameters = 2 => "inconsistent-parameters",
        InvalidParameterDataType = 3 => "invalid-parameter-data-type",
        InvalidTag = 4 => "invalid-tag",
        MissingRequiredParameter = 5 => "missing-required-parameter",
        ParameterOutOfRange = 6 => "parameter-out-of-range",
        TooManyArguments = 7 => "too-many-arguments",
        UndefinedEnumeration = 8 => "undefined-enumeration",
        UnrecognizedService = 9 => "unrecognized-service",
    }
}

named_codes! {
    /// Reasons carried by an Abort PDU.
    pub enum AbortReason: u8, Other, to_u8, from_u8 {
        Unspecified = 0 => "other",
        BufferOverflow = 1 => "buffer-overflow",
        InvalidApduInThisState = 2 => "invalid-apdu-in-this-state",
        PreemptedByHigherPriorityTask = 3 => "preempted-by-higher-priority-task",
        SegmentationNotSupported = 4 => "segmentation-not-supported",
        SecurityError = 5 => "security-error",
        InsufficientSecurity = 6 => "insufficient-security",
        WindowSizeOutOfRange = 7 => "window-size-out-of-range",
        ApplicationExceededReplyTime = 8 => "application-exceeded-reply-time",
        OutOfResources = 9 => "out-of-resources",
        TsmTimeout = 10 => "tsm-timeout",
        ApduTooLong = 11 => "apdu-too-long",
    }
}

#[cfg(test)]
mod tests {
    use super::{AbortReason, ErrorClass, ErrorCode, MaxApdu, RejectReason, Segmentation};

    #[test]
    fn max_apdu_codes_map_to_octets() {
        for code in 0..=5 {
            let max = MaxApdu::from_code(code).unwrap();
            assert_eq!(max.code(), code);
        }
        assert_eq!(MaxApdu::UpTo1476.octets(), 1476);
        assert_eq!(MaxApdu::from_code(6), None);
    }

    #[test]
    fn error_pairs_render_by_name() {
        assert_eq!(ErrorClass::from_u32(2).to_string(), "property");
        assert_eq!(ErrorCode::from_u32(32).to_string(), "unknown-property");
        assert_eq!(ErrorCode::from_u32(700), ErrorCode::Vendor(700));
        assert_eq!(ErrorCode::Vendor(700).to_string(), "700");
    }

    #[test]
    fn reasons_and_segmentation_render_by_name() {
        assert_eq!(RejectReason::from_u8(9).to_string(), "unrecognized-service");
        assert_eq!(AbortReason::from_u8(4).to_string(), "segmentation-not-supported");
        assert_eq!(AbortReason::from_u8(200), AbortReason::Other(200));
        assert_eq!(Segmentation::from_u32(3).to_string(), "no-segmentation");
    }
}
