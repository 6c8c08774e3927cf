fn main() {
    competition_participants_lib::run()
}
