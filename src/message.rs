//! In-memory message store for one chat session.
//!
//! The store is an append-ordered sequence. It only ever shrinks when a
//! typing placeholder is removed; it is never persisted.

/// Greeting seeded as the first assistant message of every session.
pub const GREETING: &str = "您好！我是银行智能客服助手，可以为您解答以下问题：\n\n\
• 账户类：挂失、余额查询、交易明细、冻结/解冻\n\
• 信用卡类：账单查询、还款、额度提升、逾期罚息、积分兑换\n\
• 基础业务类：手机银行/网银注册、转账限额、手续费、利率查询\n\
• 常见操作类：密码重置、短信提醒、银行卡解绑\n\n\
请问有什么可以帮助您的吗？";

/// Stable identifier of a message, unique for the lifetime of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Text(String),
    /// Transient placeholder shown while a turn's request is in flight.
    Typing,
}

/// Visual placement of a message: assistant on the left, user on the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Incoming,
    Outgoing,
}

/// Sender avatar, fixed per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Avatar {
    Assistant,
    User,
}

impl Avatar {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Incoming => Avatar::Assistant,
            Role::Outgoing => Avatar::User,
        }
    }

    /// Glyph rendered in front of the bubble label.
    pub fn glyph(self) -> &'static str {
        match self {
            Avatar::Assistant => "🏦",
            Avatar::User => "👤",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub kind: MessageKind,
    pub role: Role,
    pub avatar: Avatar,
}

#[derive(Debug, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
    next_id: u64,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the assistant greeting.
    pub fn new_with_greeting() -> Self {
        let mut store = Self::new();
        store.append(MessageKind::Text(GREETING.to_string()), Role::Incoming);
        store
    }

    /// Appends a message and returns its assigned id. Never fails.
    pub fn append(&mut self, kind: MessageKind, role: Role) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        self.messages.push(Message {
            id,
            kind,
            role,
            avatar: Avatar::for_role(role),
        });
        id
    }

    /// Removes the message with the given id. No-op when absent.
    pub fn delete(&mut self, id: MessageId) {
        self.messages.retain(|m| m.id != id);
    }

    /// Append-ordered snapshot for rendering.
    pub fn list(&self) -> &[Message] {
        &self.messages
    }

    pub fn typing_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.kind == MessageKind::Typing)
            .count()
    }
}
