pub const FACE: &[&str] = &[
    "Your expression feels warm and welcoming",
    "You have a very friendly presence",
    "That look carries quiet confidence",
];

pub const LIGHTING: &[&str] = &[
    "The lighting really suits you",
    "You stand out beautifully in this light",
];

pub const COLOR: &[&str] = &[
    "Your outfit has great color and personality",
    "Those colors work wonderfully together",
];

pub const COMPOSURE: &[&str] = &[
    "You carry yourself with calm confidence",
    "You look comfortable and at ease",
];

/// Used when no cue fired
pub const FALLBACK: &[&str] = &[
    "You have a kind and welcoming presence",
    "You bring a really nice energy with you",
];

pub const CLOSINGS: &[&str] = &[
    "Thanks for stopping by!",
    "Hope the rest of your day is great!",
    "Great to see you today!",
    "You just made the doorbell smile!",
];
