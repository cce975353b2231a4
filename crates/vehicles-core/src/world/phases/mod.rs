mod act;
mod advance;
mod broadcast;
mod sense;
mod think;
