named_codes! {
    /// BACnet property identifiers.
    ///
    /// The properties a scanner touches are named variants; vendor-specific or
    /// unrecognised identifiers use [`Proprietary`](Self::Proprietary).
    pub enum PropertyId: u32, Proprietary, to_u32, from_u32 {
        ActiveText = 4 => "active-text",
        ApduTimeout = 11 => "apdu-timeout",
        ApplicationSoftwareVersion = 12 => "application-software-version",
        CovIncrement = 22 => "cov-increment",
        Description = 28 => "description",
        DeviceAddressBinding = 30 => "device-address-binding",
        EventState = 36 => "event-state",
        FirmwareRevision = 44 => "firmware-revision",
        HighLimit = 45 => "high-limit",
        InactiveText = 46 => "inactive-text",
        Location = 58 => "location",
        LowLimit = 59 => "low-limit",
        MaxApduLengthAccepted = 62 => "max-apdu-length-accepted",
        MaxPresValue = 65 => "max-pres-value",
        MinPresValue = 69 => "min-pres-value",
        ModelName = 70 => "model-name",
        NumberOfApduRetries = 73 => "number-of-apdu-retries",
        NumberOfStates = 74 => "number-of-states",
        ObjectIdentifier = 75 => "object-identifier",
        ObjectList = 76 => "object-list",
        ObjectName = 77 => "object-name",
        ObjectType = 79 => "object-type",
        OutOfService = 81 => "out-of-service",
        Polarity = 84 => "polarity",
        PresentValue = 85 => "present-value",
        PriorityArray = 87 => "priority-array",
        ProtocolVersion = 98 => "protocol-version",
        Reliability = 103 => "reliability",
        RelinquishDefault = 104 => "relinquish-default",
        SegmentationSupported = 107 => "segmentation-supported",
        StateText = 110 => "state-text",
        StatusFlags = 111 => "status-flags",
        SystemStatus = 112 => "system-status",
        Units = 117 => "units",
        VendorIdentifier = 120 => "vendor-identifier",
        VendorName = 121 => "vendor-name",
        ProtocolRevision = 139 => "protocol-revision",
        DatabaseRevision = 155 => "database-revision",
        PropertyList = 371 => "property-list",
    }
}

#[cfg(test)]
mod tests {
    use super::PropertyId;

    #[test]
    fn parses_names_and_numbers() {
        assert_eq!("present-value".parse(), Ok(PropertyId::PresentValue));
        assert_eq!("presentValue".parse(), Ok(PropertyId::PresentValue));
        assert_eq!("PRIORITY_ARRAY".parse(), Ok(PropertyId::PriorityArray));
        assert_eq!("76".parse(), Ok(PropertyId::ObjectList));
        assert_eq!("5000".parse(), Ok(PropertyId::Proprietary(5000)));
    }

    #[test]
    fn unknown_numbers_keep_their_value() {
        assert_eq!(PropertyId::from_u32(9999).to_u32(), 9999);
        assert_eq!(PropertyId::Units.to_string(), "units");
    }
}
