//! Platform and genre name tables
//!
//! Maps the names a planner writes to RAWG's numeric ids. Lookups are
//! case-insensitive and accept common aliases.

struct Entry {
    id: u32,
    name: &'static str,
    aliases: &'static [&'static str],
}

const PLATFORMS: &[Entry] = &[
    Entry {
        id: 4,
        name: "PC",
        aliases: &["pc", "windows", "steam"],
    },
    Entry {
        id: 187,
        name: "PlayStation 5",
        aliases: &["playstation 5", "ps5", "playstation5"],
    },
    Entry {
        id: 18,
        name: "PlayStation 4",
        aliases: &["playstation 4", "ps4", "playstation4"],
    },
    Entry {
        id: 16,
        name: "PlayStation 3",
        aliases: &["playstation 3", "ps3"],
    },
    Entry {
        id: 186,
        name: "Xbox Series S/X",
        aliases: &[
            "xbox series s/x",
            "xbox series x",
            "xbox series s",
            "xbox series",
            "xsx",
        ],
    },
    Entry {
        id: 1,
        name: "Xbox One",
        aliases: &["xbox one", "xbone", "xbox"],
    },
    Entry {
        id: 14,
        name: "Xbox 360",
        aliases: &["xbox 360", "x360"],
    },
    Entry {
        id: 7,
        name: "Nintendo Switch",
        aliases: &["nintendo switch", "switch"],
    },
    Entry {
        id: 3,
        name: "iOS",
        aliases: &["ios", "iphone", "ipad"],
    },
    Entry {
        id: 21,
        name: "Android",
        aliases: &["android"],
    },
    Entry {
        id: 5,
        name: "macOS",
        aliases: &["macos", "mac", "os x"],
    },
    Entry {
        id: 6,
        name: "Linux",
        aliases: &["linux"],
    },
];

const GENRES: &[Entry] = &[
    Entry {
        id: 4,
        name: "Action",
        aliases: &["action"],
    },
    Entry {
        id: 51,
        name: "Indie",
        aliases: &["indie"],
    },
    Entry {
        id: 3,
        name: "Adventure",
        aliases: &["adventure"],
    },
    Entry {
        id: 5,
        name: "RPG",
        aliases: &[
            "rpg",
            "role-playing",
            "role playing",
            "role-playing-games-rpg",
        ],
    },
    Entry {
        id: 10,
        name: "Strategy",
        aliases: &["strategy"],
    },
    Entry {
        id: 2,
        name: "Shooter",
        aliases: &["shooter", "fps"],
    },
    Entry {
        id: 40,
        name: "Casual",
        aliases: &["casual"],
    },
    Entry {
        id: 14,
        name: "Simulation",
        aliases: &["simulation", "sim"],
    },
    Entry {
        id: 7,
        name: "Puzzle",
        aliases: &["puzzle"],
    },
    Entry {
        id: 11,
        name: "Arcade",
        aliases: &["arcade"],
    },
    Entry {
        id: 83,
        name: "Platformer",
        aliases: &["platformer", "platform"],
    },
    Entry {
        id: 1,
        name: "Racing",
        aliases: &["racing"],
    },
    Entry {
        id: 59,
        name: "Massively Multiplayer",
        aliases: &[
            "massively multiplayer",
            "massively-multiplayer",
            "mmo",
            "mmorpg",
        ],
    },
    Entry {
        id: 15,
        name: "Sports",
        aliases: &["sports", "sport"],
    },
    Entry {
        id: 6,
        name: "Fighting",
        aliases: &["fighting"],
    },
    Entry {
        id: 19,
        name: "Family",
        aliases: &["family"],
    },
    Entry {
        id: 28,
        name: "Board Games",
        aliases: &["board games", "board-games", "board game"],
    },
    Entry {
        id: 34,
        name: "Educational",
        aliases: &["educational"],
    },
    Entry {
        id: 17,
        name: "Card",
        aliases: &["card", "card games"],
    },
];

fn lookup(table: &[Entry], name: &str) -> Option<u32> {
    let wanted = name.trim().to_lowercase();
    table
        .iter()
        .find(|entry| {
            entry.name.to_lowercase() == wanted || entry.aliases.contains(&wanted.as_str())
        })
        .map(|entry| entry.id)
}

pub fn platform_id(name: &str) -> Option<u32> {
    lookup(PLATFORMS, name)
}

pub fn genre_id(name: &str) -> Option<u32> {
    lookup(GENRES, name)
}

pub fn platform_names() -> Vec<&'static str> {
    PLATFORMS.iter().map(|e| e.name).collect()
}

pub fn genre_names() -> Vec<&'static str> {
    GENRES.iter().map(|e| e.name).collect()
}
