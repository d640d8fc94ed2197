//! Use cases - room membership and media negotiation
pub mod negotiation_usecase;
pub mod room_usecase;

pub use negotiation_usecase::NegotiationUseCase;
pub use room_usecase::RoomUseCase;
