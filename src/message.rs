#[derive(PartialEq, Clone, Copy, Debug)]
pub enum MessageType {
    Disconnect,
    Ignore,
    Unimplemented,
    Debug,
    KexInit,
    NewKeys,
    KeyExchange(u8),
    Unknown,
}

impl From<u8> for MessageType {
    fn from(id: u8) -> Self {
        use self::MessageType::*;
        match id
        {
            1 => Disconnect,
            2 => Ignore,
            3 => Unimplemented,
            4 => Debug,
            20 => KexInit,
            21 => NewKeys,
            30..=49 => KeyExchange(id),
            _ => Unknown,
        }
    }
}

impl From<MessageType> for u8 {
    fn from(msg_type: MessageType) -> u8 {
        use self::MessageType::*;
        match msg_type
        {
            Disconnect => 1,
            Ignore => 2,
            Unimplemented => 3,
            Debug => 4,
            KexInit => 20,
            NewKeys => 21,
            KeyExchange(id) => id,
            Unknown => 255,
        }
    }
}
